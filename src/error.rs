//! Error types for the caching proxy
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Proxy Error Enum ==
/// Unified error type for the caching proxy.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// A required setting was not provided at startup
    #[error("Missing configuration: set {0}")]
    ConfigurationMissing(&'static str),

    /// A setting was provided but could not be parsed
    #[error("Invalid configuration for {key}: {reason}")]
    InvalidConfig { key: &'static str, reason: String },

    /// The request path does not carry enough segments for the key scheme
    #[error("Malformed path: {0}")]
    MalformedPath(String),

    /// The origin could not be reached, or did not answer in time
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The storage backend failed to read or write
    #[error("Storage error: {0}")]
    Storage(String),

    /// The request body exceeds the maximum entry size
    #[error("Entry too large: {0}")]
    EntryTooLarge(String),

    /// The request body could not be read
    #[error("Invalid body: {0}")]
    InvalidBody(String),
}

impl ProxyError {
    /// HTTP status this error surfaces as.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::MalformedPath(_) | ProxyError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ProxyError::EntryTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::Storage(_)
            | ProxyError::ConfigurationMissing(_)
            | ProxyError::InvalidConfig { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse::new(self.to_string()));

        (self.status_code(), body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the caching proxy.
pub type Result<T> = std::result::Result<T, ProxyError>;
