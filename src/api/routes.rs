//! API Routes
//!
//! Configures the proxy router and the admin router.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::handlers::{health_handler, proxy_handler, purge_handler, stats_handler, AppState};

/// Creates the proxy router: one fallback handler for every method and path.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .fallback(proxy_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Creates the admin router served on its own listener.
pub fn create_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/purge", post(purge_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
