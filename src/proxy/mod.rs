//! Proxy Module
//!
//! Outbound traffic to the origin: the GET fetch used on cache misses and
//! the passthrough path for every request that bypasses the cache.

mod fetcher;
mod forwarder;
mod upstream;

pub use fetcher::{OriginFetcher, OriginResponse};
pub use forwarder::Forwarder;
pub use upstream::{copy_response_headers, forward_request_headers, Upstream};
