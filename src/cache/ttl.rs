//! TTL Registry Module
//!
//! Tracks when each cache key was written and when it stops being fresh.
//! Records live only in memory; an entry found in storage without a record
//! cannot be proven fresh and is refreshed.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::cache::lock::{rw_read, rw_write};
use crate::cache::CacheKey;

// == TTL Record ==
/// Write time and expiry time of a cached entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TtlRecord {
    pub cached_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl TtlRecord {
    /// Creates a record written at `now`, saturating at the latest representable time.
    pub fn new(now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            cached_at: now,
            expires_at: now
                .checked_add_signed(ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Fresh while `now` has not passed `expires_at`; the boundary itself is fresh.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now <= self.expires_at
    }
}

// == TTL Registry ==
/// Process-wide freshness bookkeeping, safe to share across request tasks.
#[derive(Debug)]
pub struct TtlRegistry {
    ttl: Duration,
    records: RwLock<HashMap<CacheKey, TtlRecord>>,
}

impl TtlRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Records a write of `key` at `now`, replacing any previous record.
    pub fn record_write(&self, key: &CacheKey, now: DateTime<Utc>) -> TtlRecord {
        let record = TtlRecord::new(now, self.ttl);
        rw_write(&self.records, "ttl.record_write").insert(key.clone(), record);
        record
    }

    /// Returns true only when a record exists for `key` and has not expired at `now`.
    pub fn is_fresh(&self, key: &CacheKey, now: DateTime<Utc>) -> bool {
        rw_read(&self.records, "ttl.is_fresh")
            .get(key)
            .is_some_and(|record| record.is_fresh_at(now))
    }

    pub fn get(&self, key: &CacheKey) -> Option<TtlRecord> {
        rw_read(&self.records, "ttl.get").get(key).copied()
    }

    /// Drops the record for `key`, so the next read refreshes it.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        rw_write(&self.records, "ttl.invalidate")
            .remove(key)
            .is_some()
    }

    /// Drops every record and returns how many were held.
    pub fn clear(&self) -> usize {
        let mut records = rw_write(&self.records, "ttl.clear");
        let count = records.len();
        records.clear();
        count
    }

    pub fn len(&self) -> usize {
        rw_read(&self.records, "ttl.len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn key(name: &str) -> CacheKey {
        CacheKey::new("pages", name)
    }

    #[test]
    fn test_record_write_sets_expiry() {
        let registry = TtlRegistry::new(Duration::seconds(60));
        let now = Utc::now();

        let record = registry.record_write(&key("home"), now);

        assert_eq!(record.cached_at, now);
        assert_eq!(record.expires_at, now + Duration::seconds(60));
        assert_eq!(registry.get(&key("home")), Some(record));
    }

    #[test]
    fn test_missing_record_is_not_fresh() {
        let registry = TtlRegistry::new(Duration::seconds(60));
        assert!(!registry.is_fresh(&key("unknown"), Utc::now()));
    }

    #[test]
    fn test_freshness_boundary() {
        let registry = TtlRegistry::new(Duration::seconds(10));
        let now = Utc::now();
        registry.record_write(&key("home"), now);

        assert!(registry.is_fresh(&key("home"), now));
        assert!(registry.is_fresh(&key("home"), now + Duration::seconds(10)));
        assert!(!registry.is_fresh(
            &key("home"),
            now + Duration::seconds(10) + Duration::milliseconds(1)
        ));
    }

    #[test]
    fn test_rewrite_extends_expiry() {
        let registry = TtlRegistry::new(Duration::seconds(10));
        let start = Utc::now();
        registry.record_write(&key("home"), start);

        let later = start + Duration::seconds(30);
        assert!(!registry.is_fresh(&key("home"), later));

        registry.record_write(&key("home"), later);
        assert!(registry.is_fresh(&key("home"), later + Duration::seconds(5)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_expiry_saturates() {
        let record = TtlRecord::new(DateTime::<Utc>::MAX_UTC, Duration::seconds(1));
        assert_eq!(record.expires_at, DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn test_invalidate_and_clear() {
        let registry = TtlRegistry::new(Duration::seconds(60));
        let now = Utc::now();
        registry.record_write(&key("a"), now);
        registry.record_write(&key("b"), now);

        assert!(registry.invalidate(&key("a")));
        assert!(!registry.invalidate(&key("a")));
        assert!(!registry.is_fresh(&key("a"), now));

        assert_eq!(registry.clear(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_writers() {
        let registry = Arc::new(TtlRegistry::new(Duration::seconds(60)));
        let now = Utc::now();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for j in 0..100 {
                        registry.record_write(&key(&format!("{i}-{j}")), now);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.len(), 800);
    }
}
