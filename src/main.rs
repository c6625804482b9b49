//! TTL Proxy - A caching reverse proxy
//!
//! Binary entry point: loads configuration, opens storage and serves the
//! proxy on a plaintext and a TLS listener, plus the admin listener.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum_server::Handle;
use tokio::{signal, sync::watch, task::JoinSet};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ttl_proxy::{
    api::{create_admin_router, create_router},
    config::StorageKind,
    storage::{MemoryStorage, SledStorage, StorageBackend},
    tls, AppState, Config,
};

/// Time in-flight requests get to finish once shutdown starts.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Main entry point for the caching proxy.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables; missing values are fatal
/// 3. Open the storage backend and load the TLS certificate
/// 4. Bind the plaintext, TLS and admin listeners
/// 5. Serve until SIGINT/SIGTERM or until a listener fails, then drain
#[tokio::main]
async fn main() -> Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ttl_proxy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting TTL caching proxy");
    tls::install_crypto_provider();

    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        "Configuration loaded: target_url={}, ttl={}s, timeout={}s, key_mode={:?}, miss_mode={:?}, storage={:?}",
        config.target_url,
        config.ttl_secs,
        config.upstream_timeout_secs,
        config.key_mode,
        config.miss_mode,
        config.storage
    );

    let storage: Arc<dyn StorageBackend> = match config.storage {
        StorageKind::Sled => Arc::new(
            SledStorage::open(&config.db_path)
                .with_context(|| format!("Failed to open storage at {:?}", config.db_path))?,
        ),
        StorageKind::Memory => {
            warn!("Using in-memory storage; cached entries will not survive a restart");
            Arc::new(MemoryStorage::new())
        }
    };

    let state = AppState::from_config(&config, storage).context("Failed to build proxy")?;
    let app = create_router(state.clone());
    let admin = create_admin_router(state);

    let tls_config = tls::load_tls(&config)
        .await
        .context("Failed to load TLS material")?;

    let http_addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let https_addr = SocketAddr::from(([0, 0, 0, 0], config.https_port));
    let admin_addr = SocketAddr::from(([0, 0, 0, 0], config.admin_port));

    let http_listener = tokio::net::TcpListener::bind(http_addr)
        .await
        .with_context(|| format!("Failed to bind {http_addr}"))?;
    let admin_listener = tokio::net::TcpListener::bind(admin_addr)
        .await
        .with_context(|| format!("Failed to bind {admin_addr}"))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let tls_handle = Handle::new();
    let mut servers = JoinSet::new();

    info!("Listening on http://{}", http_addr);
    let rx = shutdown_rx.clone();
    let plain_app = app.clone();
    servers.spawn(async move {
        axum::serve(http_listener, plain_app)
            .with_graceful_shutdown(wait_for_shutdown(rx))
            .await
    });

    info!("Listening on https://{}", https_addr);
    servers.spawn(
        axum_server::bind_rustls(https_addr, tls_config)
            .handle(tls_handle.clone())
            .serve(app.into_make_service()),
    );

    info!("Admin listening on http://{}", admin_addr);
    servers.spawn(async move {
        axum::serve(admin_listener, admin)
            .with_graceful_shutdown(wait_for_shutdown(shutdown_rx))
            .await
    });

    tokio::select! {
        _ = shutdown_signal() => {}
        Some(result) = servers.join_next() => {
            match result {
                Ok(Ok(())) => warn!("A listener stopped unexpectedly"),
                Ok(Err(e)) => error!("Listener failed: {}", e),
                Err(e) => error!("Listener task panicked: {}", e),
            }
        }
    }

    info!("Shutting down listeners");
    let _ = shutdown_tx.send(());
    tls_handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
    while let Some(result) = servers.join_next().await {
        if let Ok(Err(e)) = result {
            error!("Listener failed during shutdown: {}", e);
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

async fn wait_for_shutdown(mut rx: watch::Receiver<()>) {
    let _ = rx.changed().await;
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
