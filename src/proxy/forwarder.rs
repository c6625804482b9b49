//! Passthrough Forwarder
//!
//! Relays requests that bypass the cache to the origin and streams the
//! origin's answer back unchanged.

use axum::{
    body::{Body, HttpBody},
    http::{header, HeaderMap, HeaderValue, Method, Uri},
    response::Response,
};
use tracing::{info, warn};

use super::upstream::{copy_response_headers, forward_request_headers, Upstream};
use crate::error::{ProxyError, Result};

/// Proxies requests that bypass the cache, streaming both bodies.
#[derive(Debug, Clone)]
pub struct Forwarder {
    upstream: Upstream,
}

impl Forwarder {
    pub fn new(upstream: Upstream) -> Self {
        Self { upstream }
    }

    /// Sends the request to the origin with the same method, path, query,
    /// headers and body, and returns the origin's response verbatim.
    pub async fn forward(
        &self,
        method: Method,
        uri: &Uri,
        headers: &HeaderMap,
        body: Body,
    ) -> Result<Response> {
        let path = uri.path_and_query().map_or("/", |pq| pq.as_str());
        let url = self.upstream.url_for(path);
        info!(method = %method, url = %url, "Forwarding");

        // A known length is sent as Content-Length rather than chunked.
        let length = body.size_hint().exact();
        let mut outbound = forward_request_headers(headers);
        if let Some(len) = length.filter(|len| *len > 0) {
            outbound.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
        }

        let mut request = self
            .upstream
            .client()
            .request(method.clone(), &url)
            .headers(outbound);
        if has_body(&body) {
            request = request.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let origin = request.send().await.map_err(|e| {
            warn!(method = %method, url = %url, error = %e, "Error forwarding");
            ProxyError::UpstreamUnavailable(e.to_string())
        })?;

        info!(method = %method, url = %url, status = %origin.status(), "Forwarded");
        let status = origin.status();
        let headers = copy_response_headers(origin.headers());
        let mut response = Response::new(Body::from_stream(origin.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

/// Bodiless requests are sent without a body rather than as an empty chunked stream.
fn has_body(body: &Body) -> bool {
    body.size_hint().exact() != Some(0)
}
