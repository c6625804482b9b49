//! API Module
//!
//! HTTP handlers and routing for the proxy and its admin listener.
//!
//! # Proxy surface
//! Every method and path is accepted:
//! - `GET /{bucket}/{key...}` - Cache Read
//! - `PUT /{bucket}/{key...}` - Cache Write (when enabled)
//! - anything else - forwarded to the origin untouched
//!
//! # Admin surface
//! - `GET /health` - Health check endpoint
//! - `GET /stats` - Cache statistics
//! - `POST /purge` - Drop every TTL record

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::{create_admin_router, create_router};
