//! Cache Statistics Module
//!
//! Tracks how cache reads were answered and how often the origin failed.

use serde::Serialize;

// == Cache Stats ==
/// Counters describing cache behaviour since startup.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Reads answered from storage
    pub hits: u64,
    /// Reads with no stored entry or no TTL record
    pub misses: u64,
    /// Reads whose stored entry had outlived its TTL
    pub expired: u64,
    /// Entries written, by PUT or by a populate after a miss
    pub writes: u64,
    /// Origin fetches that failed or timed out
    pub upstream_errors: u64,
    /// TTL records currently held
    pub tracked_keys: usize,
}

impl CacheStats {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses + expired), or 0.0 if nothing was read.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses + self.expired;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_expired(&mut self) {
        self.expired += 1;
    }

    pub fn record_write(&mut self) {
        self.writes += 1;
    }

    pub fn record_upstream_error(&mut self) {
        self.upstream_errors += 1;
    }

    pub fn set_tracked_keys(&mut self, count: usize) {
        self.tracked_keys = count;
    }
}
