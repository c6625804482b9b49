//! Upstream Module
//!
//! The shared origin client and the header rules applied in both directions.

use std::time::Duration;

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use reqwest::{redirect::Policy, Client};

use crate::error::{ProxyError, Result};

/// HTTP client bound to the origin base URL, with a fixed request timeout.
///
/// Redirects are never followed: a 3xx from the origin is the response.
#[derive(Debug, Clone)]
pub struct Upstream {
    client: Client,
    base_url: String,
}

impl Upstream {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|e| ProxyError::UpstreamUnavailable(format!("failed to build client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Joins a path (optionally with query) onto the origin base URL.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

/// Headers scoped to a single connection; never copied across the proxy.
fn is_hop_by_hop(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailer"
            | "transfer-encoding"
            | "upgrade"
    )
}

/// Copies inbound request headers for the outbound request.
///
/// Multi-value headers are joined into one comma-separated value. `Host` and
/// `Content-Length` are left for the client to set for the origin connection.
pub fn forward_request_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut outbound = HeaderMap::with_capacity(inbound.keys_len());
    for name in inbound.keys() {
        if is_hop_by_hop(name) || name == header::HOST || name == header::CONTENT_LENGTH {
            continue;
        }
        let joined = inbound
            .get_all(name)
            .iter()
            .map(|value| value.as_bytes())
            .collect::<Vec<_>>()
            .join(&b", "[..]);
        if let Ok(value) = HeaderValue::from_bytes(&joined) {
            outbound.insert(name.clone(), value);
        }
    }
    outbound
}

/// Copies origin response headers for the client, keeping repeated values.
///
/// `Content-Length` is kept: the body is relayed byte for byte.
pub fn copy_response_headers(origin: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(origin.keys_len());
    for (name, value) in origin {
        if is_hop_by_hop(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_trims_base_slash() {
        let upstream = Upstream::new("http://origin.local/", Duration::from_secs(10)).unwrap();
        assert_eq!(upstream.url_for("/pages/home"), "http://origin.local/pages/home");
        assert_eq!(upstream.url_for("pages/home?x=1"), "http://origin.local/pages/home?x=1");
    }

    #[test]
    fn test_forward_joins_multi_value_headers() {
        let mut inbound = HeaderMap::new();
        inbound.append("accept", HeaderValue::from_static("text/html"));
        inbound.append("accept", HeaderValue::from_static("application/json"));
        inbound.insert("x-trace-id", HeaderValue::from_static("abc"));

        let outbound = forward_request_headers(&inbound);
        assert_eq!(outbound.get_all("accept").iter().count(), 1);
        assert_eq!(outbound["accept"], "text/html, application/json");
        assert_eq!(outbound["x-trace-id"], "abc");
    }

    #[test]
    fn test_forward_drops_connection_headers() {
        let mut inbound = HeaderMap::new();
        inbound.insert(header::HOST, HeaderValue::from_static("proxy.local"));
        inbound.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        inbound.insert(header::CONTENT_LENGTH, HeaderValue::from_static("4"));
        inbound.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));

        let outbound = forward_request_headers(&inbound);
        assert!(outbound.get(header::HOST).is_none());
        assert!(outbound.get(header::CONNECTION).is_none());
        assert!(outbound.get(header::CONTENT_LENGTH).is_none());
        assert_eq!(outbound[header::CONTENT_TYPE], "text/plain");
    }

    #[test]
    fn test_copy_response_headers_keeps_repeats() {
        let mut origin = HeaderMap::new();
        origin.append(header::SET_COOKIE, HeaderValue::from_static("a=1"));
        origin.append(header::SET_COOKIE, HeaderValue::from_static("b=2"));
        origin.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        origin.insert(header::CONTENT_LENGTH, HeaderValue::from_static("12"));

        let headers = copy_response_headers(&origin);
        assert_eq!(headers.get_all(header::SET_COOKIE).iter().count(), 2);
        assert!(headers.get(header::TRANSFER_ENCODING).is_none());
        assert_eq!(headers[header::CONTENT_LENGTH], "12");
    }
}
