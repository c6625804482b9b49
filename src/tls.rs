//! TLS Module
//!
//! Crypto provider setup and certificate loading for the TLS listener.

use axum_server::tls_rustls::RustlsConfig;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{ProxyError, Result};

/// Installs ring as the process-wide rustls crypto provider.
///
/// Must run before any rustls config is built. Repeated calls keep the
/// provider that is already installed.
pub fn install_crypto_provider() {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }
}

/// Loads the PEM certificate chain and private key named by the config.
pub async fn load_tls(config: &Config) -> Result<RustlsConfig> {
    install_crypto_provider();

    let tls = RustlsConfig::from_pem_file(&config.cert_path, &config.cert_key_path)
        .await
        .map_err(|e| ProxyError::InvalidConfig {
            key: "CERT_PATH",
            reason: format!(
                "cannot load {:?} with key {:?}: {e}",
                config.cert_path, config.cert_key_path
            ),
        })?;

    info!(cert = ?config.cert_path, "Loaded TLS certificate");
    Ok(tls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    fn tls_config(cert: &str, key: &str) -> Config {
        let mut config = Config::new("http://127.0.0.1:1");
        config.cert_path = fixture(cert);
        config.cert_key_path = fixture(key);
        config
    }

    #[tokio::test]
    async fn test_load_tls_from_pem_pair() {
        let result = load_tls(&tls_config("cert.pem", "key.pem")).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_load_tls_twice_reuses_provider() {
        let config = tls_config("cert.pem", "key.pem");
        assert!(load_tls(&config).await.is_ok());
        assert!(load_tls(&config).await.is_ok());
    }

    #[tokio::test]
    async fn test_load_tls_missing_file() {
        let result = load_tls(&tls_config("cert.pem", "missing.pem")).await;
        assert!(matches!(
            result,
            Err(ProxyError::InvalidConfig { key: "CERT_PATH", .. })
        ));
    }

    #[tokio::test]
    async fn test_load_tls_rejects_certificate_as_key() {
        let result = load_tls(&tls_config("cert.pem", "cert.pem")).await;
        assert!(result.is_err());
    }
}
