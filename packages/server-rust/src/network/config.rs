//! Listener settings derived from the service configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::config::ServiceConfig;

/// Bind, TLS and timeout settings for the HTTP listener.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Bind address for the server.
    pub host: String,
    /// Port to listen on. 0 means OS-assigned.
    pub port: u16,
    /// Terminate TLS in-process when set.
    pub tls: Option<TlsConfig>,
    /// Allowed CORS origins.
    pub cors_origins: Vec<String>,
    /// Maximum time to wait for a request to complete.
    pub request_timeout: Duration,
    /// Upper bound on graceful shutdown.
    pub shutdown_timeout: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::from(&ServiceConfig {
            port: 0,
            ..ServiceConfig::default()
        })
    }
}

impl From<&ServiceConfig> for NetworkConfig {
    fn from(service: &ServiceConfig) -> Self {
        Self {
            host: service.host.clone(),
            port: service.port,
            tls: service.tls.as_ref().map(|tls| TlsConfig {
                cert_path: tls.cert_file.clone(),
                key_path: tls.key_file.clone(),
            }),
            cors_origins: service.cors_origins.clone(),
            request_timeout: Duration::from_secs(service.request_timeout_secs),
            shutdown_timeout: Duration::from_secs(service.shutdown_timeout_secs),
        }
    }
}

/// PEM certificate chain and private key paths.
#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}
