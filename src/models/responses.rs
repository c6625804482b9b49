//! Response DTOs for the proxy
//!
//! Defines the structure of JSON response bodies produced by the proxy itself.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::{CacheStats, CacheWrite};

/// Response body for a Cache Write (PUT /{bucket}/{key...})
#[derive(Debug, Clone, Serialize)]
pub struct WriteResponse {
    /// Success message
    pub message: String,
    /// Bucket the entry was stored under
    pub bucket: String,
    /// Key the entry was stored under
    pub key: String,
    /// When the entry stops being fresh
    pub expires_at: DateTime<Utc>,
    /// Whether the `/clear` hook ran first
    pub cleared: bool,
}

impl From<CacheWrite> for WriteResponse {
    fn from(write: CacheWrite) -> Self {
        Self {
            message: format!("Key '{}' stored successfully", write.key),
            bucket: write.key.bucket,
            key: write.key.key,
            expires_at: write.record.expires_at,
            cleared: write.cleared,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub expired: u64,
    pub writes: u64,
    pub upstream_errors: u64,
    /// TTL records currently held
    pub tracked_keys: usize,
    /// hits / (hits + misses + expired)
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            expired: stats.expired,
            writes: stats.writes,
            upstream_errors: stats.upstream_errors,
            tracked_keys: stats.tracked_keys,
        }
    }
}

/// Response body for the purge endpoint (POST /purge)
#[derive(Debug, Clone, Serialize)]
pub struct PurgeResponse {
    pub message: String,
    /// TTL records dropped
    pub purged: usize,
}

impl PurgeResponse {
    pub fn new(purged: usize) -> Self {
        Self {
            message: format!("Purged {} TTL records", purged),
            purged,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
