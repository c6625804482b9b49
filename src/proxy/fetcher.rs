//! Origin Fetcher
//!
//! The outbound GET issued when a cache read cannot be served from storage.

use axum::http::{header, HeaderMap, StatusCode};
use bytes::Bytes;
use tracing::{info, warn};

use super::upstream::{copy_response_headers, forward_request_headers, Upstream};
use crate::error::{ProxyError, Result};

/// Status and body returned by the origin for a cache-miss fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginResponse {
    pub status: StatusCode,
    /// Origin headers minus hop-by-hop and `Content-Length`
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl OriginResponse {
    /// Only complete `200 OK` bodies are stored; partial and error responses pass through.
    pub fn is_cacheable(&self) -> bool {
        self.status == StatusCode::OK
    }
}

/// Issues the outbound GET for a cache miss.
#[derive(Debug, Clone)]
pub struct OriginFetcher {
    upstream: Upstream,
}

impl OriginFetcher {
    pub fn new(upstream: Upstream) -> Self {
        Self { upstream }
    }

    /// Fetches `path` from the origin, forwarding the inbound headers.
    ///
    /// `Accept-Encoding` is dropped: stored bytes are served without the
    /// origin's `Content-Encoding`, so they must arrive unencoded. Any failure
    /// to build, send or read the request, including the timeout, is reported
    /// as `UpstreamUnavailable`.
    pub async fn fetch(&self, path: &str, headers: &HeaderMap) -> Result<OriginResponse> {
        let url = self.upstream.url_for(path);
        info!(url = %url, "Fetching");

        let mut outbound = forward_request_headers(headers);
        outbound.remove(header::ACCEPT_ENCODING);

        let response = self
            .upstream
            .client()
            .get(&url)
            .headers(outbound)
            .send()
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "Error fetching");
                ProxyError::UpstreamUnavailable(e.to_string())
            })?;

        let status = response.status();
        let mut origin_headers = copy_response_headers(response.headers());
        origin_headers.remove(header::CONTENT_LENGTH);
        let body = response.bytes().await.map_err(|e| {
            warn!(url = %url, error = %e, "Error reading origin body");
            ProxyError::UpstreamUnavailable(e.to_string())
        })?;

        Ok(OriginResponse {
            status,
            headers: origin_headers,
            body,
        })
    }
}
