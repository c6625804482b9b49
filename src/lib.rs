//! TTL Proxy - A caching reverse proxy
//!
//! Serves origin responses from a persistent key-value store while they are
//! fresh, and forwards everything else to the origin.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod proxy;
pub mod storage;
pub mod tls;

pub use api::AppState;
pub use config::Config;
pub use error::{ProxyError, Result};
