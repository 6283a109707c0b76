//! Service configuration types and the layered file/env/secret loader.

pub mod database;
pub mod loader;

use std::path::PathBuf;

use evalhub_core::{BenchmarkResource, Provider};
use serde::{Deserialize, Serialize};

pub use database::{DatabaseConfig, JsonDatabaseConfig, OtherDatabaseConfig, SqlDatabaseConfig};
pub use loader::{ConfigError, ConfigLoader};

/// Process-wide configuration, loaded once at startup and shared read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// HTTP service settings. Required: loading fails without a `service` section.
    pub service: ServiceConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<DatabaseConfig>,
    /// Evaluation providers served by the catalog endpoints.
    #[serde(default)]
    pub providers: Vec<Provider>,
    /// Benchmarks served by the catalog endpoints.
    #[serde(default)]
    pub benchmarks: Vec<BenchmarkResource>,
    /// Injected by the binary, never read from files.
    #[serde(skip)]
    pub build: BuildInfo,
}

impl Config {
    /// Minimal configuration with default service settings.
    #[must_use]
    pub fn with_service(service: ServiceConfig) -> Self {
        Self {
            service,
            database: None,
            providers: Vec::new(),
            benchmarks: Vec::new(),
            build: BuildInfo::default(),
        }
    }
}

/// HTTP service settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    /// File written once the listener is bound (readiness marker).
    pub ready_file: Option<PathBuf>,
    /// File receiving the fatal error message when startup fails.
    pub termination_file: Option<PathBuf>,
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
    pub shutdown_timeout_secs: u64,
    pub tls: Option<TlsSettings>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            ready_file: None,
            termination_file: None,
            cors_origins: vec!["*".to_string()],
            request_timeout_secs: 15,
            shutdown_timeout_secs: 30,
            tls: None,
        }
    }
}

/// PEM certificate and key for terminating TLS in-process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsSettings {
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
}

/// Version metadata stamped in at build time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    pub version: String,
    pub build: String,
    pub build_date: String,
}
