//! Cache Engine Module
//!
//! Cache Read (GET) and Cache Write (PUT) paths. A read is served from
//! storage only when the entry exists and its TTL record is fresh; anything
//! else goes to the origin and the result is stored for later reads.

use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use chrono::Utc;
use tracing::{info, warn};

use crate::cache::lock::{rw_read, rw_write};
use crate::cache::{CacheKey, CacheStats, KeyMode, TtlRecord, TtlRegistry};
use crate::config::{Config, MissMode};
use crate::error::{ProxyError, Result};
use crate::proxy::{OriginFetcher, OriginResponse};
use crate::storage::StorageBackend;

/// Response header reporting how a read was answered.
pub const X_CACHE: &str = "x-cache";

/// Path suffix on PUT that first drops the bucket's derived `CLEAR_ALL_KEY` entry.
pub const CLEAR_SUFFIX: &str = "/clear";

pub const CLEAR_ALL_KEY: &str = "all";

// == Cache Outcome ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Served from storage
    Hit,
    /// No stored entry, or no TTL record for it
    Miss,
    /// Stored entry outlived its TTL
    Expired,
    /// Populate running in the background
    Deferred,
}

impl CacheOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheOutcome::Hit => "HIT",
            CacheOutcome::Miss => "MISS",
            CacheOutcome::Expired => "EXPIRED",
            CacheOutcome::Deferred => "DEFERRED",
        }
    }
}

// == Cache Read Result ==
#[derive(Debug, Clone)]
pub struct CacheRead {
    pub outcome: CacheOutcome,
    pub status: StatusCode,
    /// Origin headers when the read went to the origin, empty on a hit
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl IntoResponse for CacheRead {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.headers, self.body).into_response();
        let headers = response.headers_mut();
        headers.insert(X_CACHE, HeaderValue::from_static(self.outcome.as_str()));
        if self.outcome == CacheOutcome::Deferred {
            headers.insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
        }
        response
    }
}

// == Cache Write Result ==
#[derive(Debug, Clone)]
pub struct CacheWrite {
    pub key: CacheKey,
    pub record: TtlRecord,
    /// Whether the `/clear` hook ran before the write
    pub cleared: bool,
}

// == Cache Engine ==
pub struct CacheEngine {
    key_mode: KeyMode,
    miss_mode: MissMode,
    storage: Arc<dyn StorageBackend>,
    ttl: TtlRegistry,
    fetcher: OriginFetcher,
    /// Bound on every storage call
    io_timeout: Duration,
    stats: RwLock<CacheStats>,
}

impl CacheEngine {
    pub fn new(config: &Config, storage: Arc<dyn StorageBackend>, fetcher: OriginFetcher) -> Self {
        Self {
            key_mode: config.key_mode,
            miss_mode: config.miss_mode,
            storage,
            ttl: TtlRegistry::new(config.ttl()),
            fetcher,
            io_timeout: config.upstream_timeout(),
            stats: RwLock::new(CacheStats::new()),
        }
    }

    pub fn ttl_registry(&self) -> &TtlRegistry {
        &self.ttl
    }

    pub fn storage(&self) -> &Arc<dyn StorageBackend> {
        &self.storage
    }

    // == Cache Read ==
    /// Answers a GET for `path` from storage when fresh, otherwise from the origin.
    ///
    /// Storage read failures are logged and handled as a miss.
    pub async fn read(self: &Arc<Self>, path: &str, headers: &HeaderMap) -> Result<CacheRead> {
        let key = self.key_mode.resolve(path)?;

        let stored = match self.bounded("get", self.storage.get(&key.bucket, &key.key)).await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(key = %key, error = %e, "Storage read failed, refreshing from origin");
                None
            }
        };

        let outcome = match stored {
            Some(body) if self.ttl.is_fresh(&key, Utc::now()) => {
                info!(key = %key, "Cache HIT");
                rw_write(&self.stats, "stats.hit").record_hit();
                return Ok(CacheRead {
                    outcome: CacheOutcome::Hit,
                    status: StatusCode::OK,
                    headers: HeaderMap::new(),
                    body,
                });
            }
            Some(_) if self.ttl.get(&key).is_some() => {
                info!(key = %key, "Cache MISS (Expired)");
                rw_write(&self.stats, "stats.expired").record_expired();
                CacheOutcome::Expired
            }
            _ => {
                info!(key = %key, "Cache MISS");
                rw_write(&self.stats, "stats.miss").record_miss();
                CacheOutcome::Miss
            }
        };

        match self.miss_mode {
            MissMode::Inline => {
                let origin = self.populate(&key, path, headers).await?;
                Ok(CacheRead {
                    outcome,
                    status: origin.status,
                    headers: origin.headers,
                    body: origin.body,
                })
            }
            MissMode::Deferred => {
                let engine = Arc::clone(self);
                let path = path.to_string();
                let headers = headers.clone();
                tokio::spawn(async move {
                    if let Err(e) = engine.populate(&key, &path, &headers).await {
                        warn!(key = %key, error = %e, "Background populate failed");
                    }
                });
                Ok(CacheRead {
                    outcome: CacheOutcome::Deferred,
                    status: StatusCode::ACCEPTED,
                    headers: HeaderMap::new(),
                    body: Bytes::new(),
                })
            }
        }
    }

    // == Populate ==
    /// Fetches `path` from the origin and, for a `200 OK`, stores the body
    /// and records its TTL. Other statuses are returned without being stored.
    pub async fn populate(
        &self,
        key: &CacheKey,
        path: &str,
        headers: &HeaderMap,
    ) -> Result<OriginResponse> {
        let origin = match self.fetcher.fetch(path, headers).await {
            Ok(origin) => origin,
            Err(e) => {
                rw_write(&self.stats, "stats.upstream_error").record_upstream_error();
                return Err(e);
            }
        };

        if origin.is_cacheable() {
            let record = self.store(key, origin.body.clone()).await?;
            info!(key = %key, expires_at = %record.expires_at, "Cached");
        } else {
            info!(key = %key, status = %origin.status, "Origin response not cached");
        }
        Ok(origin)
    }

    // == Cache Write ==
    /// Stores `body` under the key for `path` and marks it fresh.
    ///
    /// A trailing `/clear` segment is stripped when the remaining path still
    /// resolves to a key; the bucket's `CLEAR_ALL_KEY` entry is then deleted
    /// first, best effort.
    pub async fn write(&self, path: &str, body: Bytes) -> Result<CacheWrite> {
        let cleared_key = path
            .strip_suffix(CLEAR_SUFFIX)
            .and_then(|rest| self.key_mode.resolve(rest).ok());
        let (key, cleared) = match cleared_key {
            Some(key) => (key, true),
            None => (self.key_mode.resolve(path)?, false),
        };

        if cleared {
            self.clear_all(&key.bucket).await;
        }

        let record = self.store(&key, body).await?;
        info!(key = %key, expires_at = %record.expires_at, "Cache WRITE");
        Ok(CacheWrite {
            key,
            record,
            cleared,
        })
    }

    /// Drops every TTL record; stored entries are refreshed on their next read.
    pub fn purge(&self) -> usize {
        let dropped = self.ttl.clear();
        info!(dropped, "Purged TTL records");
        dropped
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = rw_read(&self.stats, "stats.snapshot").clone();
        stats.set_tracked_keys(self.ttl.len());
        stats
    }

    /// Storage first, then TTL: a record never points at bytes that were not written.
    async fn store(&self, key: &CacheKey, body: Bytes) -> Result<TtlRecord> {
        self.bounded("set", self.storage.set(&key.bucket, &key.key, body))
            .await?;
        let record = self.ttl.record_write(key, Utc::now());
        rw_write(&self.stats, "stats.write").record_write();
        Ok(record)
    }

    async fn clear_all(&self, bucket: &str) {
        let all = CacheKey::new(bucket, CLEAR_ALL_KEY);
        if let Err(e) = self
            .bounded("delete", self.storage.delete(&all.bucket, &all.key))
            .await
        {
            warn!(key = %all, error = %e, "Clear failed");
        }
        self.ttl.invalidate(&all);
    }

    async fn bounded<T>(&self, op: &str, call: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.io_timeout, call)
            .await
            .map_err(|_| {
                ProxyError::Storage(format!("{op} timed out after {:?}", self.io_timeout))
            })?
    }
}
