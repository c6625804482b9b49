//! Configuration Module
//!
//! Loads the proxy configuration once at startup. The resulting `Config` is
//! immutable and handed to every component that needs it.

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Url;

use crate::cache::KeyMode;
use crate::error::{ProxyError, Result};

/// Upper bound accepted for `TTL`, roughly one hundred years.
pub const MAX_TTL_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// How a cache miss on GET is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissMode {
    /// Fetch from the origin while the client waits and return the body.
    Inline,
    /// Answer `202 Accepted` immediately and populate in the background.
    Deferred,
}

impl FromStr for MissMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inline" => Ok(MissMode::Inline),
            "deferred" => Ok(MissMode::Deferred),
            other => Err(format!("expected `inline` or `deferred`, got `{other}`")),
        }
    }
}

/// Which storage backend holds cached bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Sled,
    Memory,
}

impl FromStr for StorageKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sled" => Ok(StorageKind::Sled),
            "memory" => Ok(StorageKind::Memory),
            other => Err(format!("expected `sled` or `memory`, got `{other}`")),
        }
    }
}

/// Proxy configuration parameters.
#[derive(Debug, Clone)]
pub struct Config {
    /// Origin base URL, without a trailing slash
    pub target_url: String,
    /// Plaintext listener port
    pub http_port: u16,
    /// TLS listener port
    pub https_port: u16,
    /// Admin listener port (health, stats, purge)
    pub admin_port: u16,
    /// PEM certificate for the TLS listener
    pub cert_path: PathBuf,
    /// PEM private key for the TLS listener
    pub cert_key_path: PathBuf,
    /// Seconds a cached entry stays fresh
    pub ttl_secs: u64,
    /// Seconds any outbound or storage call may take
    pub upstream_timeout_secs: u64,
    /// Directory of the sled database
    pub db_path: PathBuf,
    pub storage: StorageKind,
    pub key_mode: KeyMode,
    pub miss_mode: MissMode,
    /// Whether PUT seeds the cache instead of being forwarded
    pub cache_writes: bool,
}

impl Config {
    /// Creates a config for the given origin with every other value defaulted.
    ///
    /// TLS paths are left empty; callers that bind the TLS listener must set them.
    pub fn new(target_url: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into().trim_end_matches('/').to_string(),
            http_port: 8080,
            https_port: 4433,
            admin_port: 8881,
            cert_path: PathBuf::new(),
            cert_key_path: PathBuf::new(),
            ttl_secs: 3600,
            upstream_timeout_secs: 10,
            db_path: PathBuf::from("db"),
            storage: StorageKind::Sled,
            key_mode: KeyMode::Segmented,
            miss_mode: MissMode::Inline,
            cache_writes: true,
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `TARGET_URL` - Origin base URL (required)
    /// - `CERT_PATH` / `CERT_KEY_PATH` - TLS certificate and key (required)
    /// - `HTTP_PORT` (8080), `HTTPS_PORT` (4433), `ADMIN_PORT` (8881)
    /// - `TTL` - Freshness window in seconds (3600)
    /// - `UPSTREAM_TIMEOUT` - Outbound and storage timeout in seconds (10)
    /// - `DB_PATH` (`db`), `STORAGE` (`sled` | `memory`)
    /// - `KEY_MODE` (`segmented` | `flat`), `MISS_MODE` (`inline` | `deferred`)
    /// - `CACHE_WRITES` - PUT seeds the cache (true)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let target_url = required(&lookup, "TARGET_URL")?;
        let parsed = Url::parse(&target_url).map_err(|e| ProxyError::InvalidConfig {
            key: "TARGET_URL",
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ProxyError::InvalidConfig {
                key: "TARGET_URL",
                reason: format!("unsupported scheme `{}`", parsed.scheme()),
            });
        }

        let mut config = Self::new(target_url);
        config.cert_path = required(&lookup, "CERT_PATH")?.into();
        config.cert_key_path = required(&lookup, "CERT_KEY_PATH")?.into();
        config.http_port = parse_or(&lookup, "HTTP_PORT", config.http_port)?;
        config.https_port = parse_or(&lookup, "HTTPS_PORT", config.https_port)?;
        config.admin_port = parse_or(&lookup, "ADMIN_PORT", config.admin_port)?;
        config.ttl_secs = parse_or(&lookup, "TTL", config.ttl_secs)?;
        config.upstream_timeout_secs =
            parse_or(&lookup, "UPSTREAM_TIMEOUT", config.upstream_timeout_secs)?;
        config.storage = parse_or(&lookup, "STORAGE", config.storage)?;
        config.key_mode = parse_or(&lookup, "KEY_MODE", config.key_mode)?;
        config.miss_mode = parse_or(&lookup, "MISS_MODE", config.miss_mode)?;
        config.cache_writes = parse_or(&lookup, "CACHE_WRITES", config.cache_writes)?;
        if let Some(path) = non_empty(&lookup, "DB_PATH") {
            config.db_path = path.into();
        }

        if config.ttl_secs > MAX_TTL_SECS {
            return Err(ProxyError::InvalidConfig {
                key: "TTL",
                reason: format!("must not exceed {MAX_TTL_SECS} seconds"),
            });
        }
        if config.upstream_timeout_secs == 0 {
            return Err(ProxyError::InvalidConfig {
                key: "UPSTREAM_TIMEOUT",
                reason: "must be at least one second".to_string(),
            });
        }

        Ok(config)
    }

    /// Freshness window as a chrono duration.
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.ttl_secs as i64)
    }

    /// Bound applied to every outbound request and storage call.
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|v| !v.trim().is_empty())
}

fn required<F>(lookup: &F, key: &'static str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup, key).ok_or(ProxyError::ConfigurationMissing(key))
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match non_empty(lookup, key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ProxyError::InvalidConfig {
            key,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
