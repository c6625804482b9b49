//! API Handlers
//!
//! The wildcard proxy handler and the admin endpoint handlers.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use tracing::debug;

use crate::cache::{CacheEngine, MAX_ENTRY_SIZE};
use crate::config::Config;
use crate::error::{ProxyError, Result};
use crate::models::{HealthResponse, PurgeResponse, StatsResponse, WriteResponse};
use crate::proxy::{Forwarder, OriginFetcher, Upstream};
use crate::storage::StorageBackend;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<CacheEngine>,
    pub forwarder: Forwarder,
    /// Whether PUT seeds the cache instead of being forwarded
    pub cache_writes: bool,
}

impl AppState {
    pub fn new(engine: Arc<CacheEngine>, forwarder: Forwarder, cache_writes: bool) -> Self {
        Self {
            engine,
            forwarder,
            cache_writes,
        }
    }

    /// Builds the engine and forwarder around one shared origin client.
    pub fn from_config(config: &Config, storage: Arc<dyn StorageBackend>) -> Result<Self> {
        let upstream = Upstream::new(&config.target_url, config.upstream_timeout())?;
        let engine = CacheEngine::new(config, storage, OriginFetcher::new(upstream.clone()));
        Ok(Self::new(
            Arc::new(engine),
            Forwarder::new(upstream),
            config.cache_writes,
        ))
    }
}

/// Path a request takes through the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    CacheRead,
    CacheWrite,
    Passthrough,
}

impl Route {
    /// Classifies a request by method alone.
    pub fn classify(method: &Method, cache_writes: bool) -> Self {
        if method == Method::GET {
            Route::CacheRead
        } else if method == Method::PUT && cache_writes {
            Route::CacheWrite
        } else {
            Route::Passthrough
        }
    }
}

/// Handler for every proxied request.
pub async fn proxy_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let route = Route::classify(&method, state.cache_writes);
    debug!(method = %method, path = uri.path(), ?route, "Incoming request");

    match route {
        Route::CacheRead => state
            .engine
            .read(uri.path(), &headers)
            .await
            .into_response(),
        Route::CacheWrite => cache_write(&state, uri.path(), &headers, body)
            .await
            .into_response(),
        Route::Passthrough => state
            .forwarder
            .forward(method, &uri, &headers, body)
            .await
            .into_response(),
    }
}

async fn cache_write(
    state: &AppState,
    path: &str,
    headers: &HeaderMap,
    body: Body,
) -> Result<Json<WriteResponse>> {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > MAX_ENTRY_SIZE) {
        return Err(ProxyError::EntryTooLarge(format!(
            "body exceeds {MAX_ENTRY_SIZE} bytes"
        )));
    }

    let bytes: Bytes = axum::body::to_bytes(body, MAX_ENTRY_SIZE)
        .await
        .map_err(|e| ProxyError::InvalidBody(e.to_string()))?;

    let write = state.engine.write(path, bytes).await?;
    Ok(Json(WriteResponse::from(write)))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.engine.stats()))
}

/// Handler for POST /purge
pub async fn purge_handler(State(state): State<AppState>) -> Json<PurgeResponse> {
    Json(PurgeResponse::new(state.engine.purge()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn test_state() -> AppState {
        let config = Config::new("http://127.0.0.1:1");
        AppState::from_config(&config, Arc::new(MemoryStorage::new())).unwrap()
    }

    #[test]
    fn test_classify() {
        assert_eq!(Route::classify(&Method::GET, true), Route::CacheRead);
        assert_eq!(Route::classify(&Method::PUT, true), Route::CacheWrite);
        assert_eq!(Route::classify(&Method::PUT, false), Route::Passthrough);
        assert_eq!(Route::classify(&Method::POST, true), Route::Passthrough);
        assert_eq!(Route::classify(&Method::DELETE, true), Route::Passthrough);
        assert_eq!(Route::classify(&Method::HEAD, true), Route::Passthrough);
    }

    #[tokio::test]
    async fn test_cache_write_handler() {
        let state = test_state();

        let response = cache_write(&state, "/pages/home", &HeaderMap::new(), Body::from("v1"))
            .await
            .unwrap();
        assert_eq!(response.bucket, "pages");
        assert_eq!(response.key, "home");
        assert!(!response.cleared);
    }

    #[tokio::test]
    async fn test_cache_write_rejects_declared_oversize() {
        let state = test_state();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_LENGTH,
            (MAX_ENTRY_SIZE + 1).to_string().parse().unwrap(),
        );

        let result = cache_write(&state, "/pages/home", &headers, Body::empty()).await;
        assert!(matches!(result, Err(ProxyError::EntryTooLarge(_))));
    }

    #[tokio::test]
    async fn test_stats_and_purge_handlers() {
        let state = test_state();
        let written = cache_write(&state, "/pages/home", &HeaderMap::new(), Body::from("v1"))
            .await
            .unwrap();
        assert_eq!(written.key, "home");

        let stats = stats_handler(State(state.clone())).await;
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.tracked_keys, 1);

        let purged = purge_handler(State(state.clone())).await;
        assert_eq!(purged.purged, 1);

        let stats = stats_handler(State(state)).await;
        assert_eq!(stats.tracked_keys, 0);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
