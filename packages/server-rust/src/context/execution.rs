//! Per-request execution context.

use std::collections::HashMap;
use std::sync::Arc;

use http::header::{HeaderMap, HOST};
use http::request::Parts;
use http::Method;

use super::enrich::logger_with_request;
use crate::config::Config;
use crate::logging::Logger;

/// Default job timeout attached to every context.
pub const DEFAULT_TIMEOUT_MINUTES: u32 = 60;
/// Default retry budget attached to every context.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Whether the connection a request arrived on was TLS-terminated here.
///
/// The TLS listener inserts [`ConnectionSecurity::Tls`] as a request
/// extension. A missing extension means plaintext.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionSecurity {
    #[default]
    Plain,
    Tls,
}

impl ConnectionSecurity {
    #[must_use]
    pub const fn scheme(self) -> &'static str {
        match self {
            Self::Plain => "http",
            Self::Tls => "https",
        }
    }
}

/// Everything a handler needs to serve one request.
///
/// Built once per request and owned by that request; the metadata map is
/// never shared between contexts. A context is moved into its handler,
/// never cloned across tasks.
#[derive(Debug)]
pub struct ExecutionContext {
    /// Request-enriched logger.
    pub logger: Logger,
    pub config: Arc<Config>,
    pub method: Method,
    /// Request path, as received.
    pub uri: String,
    /// `scheme://host` the request was addressed to.
    pub base_url: String,
    /// Query string without the leading `?`; empty when absent.
    pub raw_query: String,
    pub headers: HeaderMap,
    pub timeout_minutes: u32,
    pub retry_attempts: u32,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ExecutionContext {
    /// Builds the context for `parts`, deriving a request logger from `logger`.
    #[must_use]
    pub fn new(parts: &Parts, logger: &Logger, config: Arc<Config>) -> Self {
        let security = parts
            .extensions
            .get::<ConnectionSecurity>()
            .copied()
            .unwrap_or_default();

        Self {
            logger: logger_with_request(logger, parts),
            config,
            method: parts.method.clone(),
            uri: parts.uri.path().to_string(),
            base_url: format!("{}://{}", security.scheme(), request_host(parts)),
            raw_query: parts.uri.query().unwrap_or_default().to_string(),
            headers: parts.headers.clone(),
            timeout_minutes: DEFAULT_TIMEOUT_MINUTES,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            metadata: HashMap::new(),
        }
    }

    /// Absolute URL of the request path (no query).
    #[must_use]
    pub fn href(&self) -> String {
        format!("{}{}", self.base_url, self.uri)
    }
}

/// `Host` header, else the authority of an absolute-form request target.
fn request_host(parts: &Parts) -> String {
    parts
        .headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| {
            parts.uri.authority().map(|a| match a.port() {
                Some(port) => format!("{}:{port}", a.host()),
                None => a.host().to_string(),
            })
        })
        .unwrap_or_default()
}
