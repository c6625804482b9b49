//! Response models for the proxy's own endpoints
//!
//! The proxied surface returns origin or cached bytes untouched; these DTOs
//! cover cache-write acknowledgements, errors and the admin listener.

pub mod responses;

// Re-export commonly used types
pub use responses::{
    ErrorResponse, HealthResponse, PurgeResponse, StatsResponse, WriteResponse,
};
