//! Structured logging: subscriber setup and the request-scoped [`Logger`] handle.
//!
//! A [`Logger`] is an immutable list of structured fields. Deriving a logger
//! never mutates the parent: [`Logger::with`] and [`Logger::with_fields`]
//! return a new handle holding the parent's fields followed by the new ones.
//!
//! Events go through [`log_debug!`](crate::log_debug), [`log_info!`](crate::log_info),
//! [`log_warn!`](crate::log_warn) and [`log_error!`](crate::log_error). Each
//! expands to a `tracing` event at the call site, so the event's target is
//! the calling module, and carries the logger's fields on the event itself.
//! Field attachment therefore never depends on a span being enabled.

use std::fmt;

use tracing_subscriber::EnvFilter;

/// Environment variable that switches the service into development mode.
pub const DEVELOPMENT_ENV_VAR: &str = "EVAL_HUB_DEVELOPMENT";

/// Well-known structured log field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogKey {
    RequestId,
    Method,
    Uri,
    UserAgent,
    RemoteAddr,
    RemoteUser,
    Referer,
}

impl LogKey {
    /// Returns the field name as it appears in log records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RequestId => "request_id",
            Self::Method => "method",
            Self::Uri => "uri",
            Self::UserAgent => "user_agent",
            Self::RemoteAddr => "remote_addr",
            Self::RemoteUser => "remote_user",
            Self::Referer => "referer",
        }
    }
}

impl fmt::Display for LogKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structured field attached to a [`Logger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogField {
    pub key: LogKey,
    pub value: String,
}

impl LogField {
    #[must_use]
    pub fn new(key: LogKey, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

/// Immutable structured logger handle.
///
/// The process-wide base logger is created once with [`Logger::root`];
/// request handlers receive derived children.
#[derive(Debug, Clone, Default)]
pub struct Logger {
    fields: Vec<LogField>,
}

impl Logger {
    /// Creates the process-wide base logger with no fields.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Returns a derived logger with one more field.
    ///
    /// An empty `value` is skipped: fields are either present with a
    /// non-empty value or absent.
    #[must_use]
    pub fn with(&self, key: LogKey, value: impl Into<String>) -> Self {
        self.with_fields([LogField::new(key, value)])
    }

    /// Returns a derived logger with `fields` appended in iteration order.
    ///
    /// Fields with empty values are dropped. Existing fields are never
    /// removed or rewritten; a repeated key is appended after the earlier one.
    #[must_use]
    pub fn with_fields(&self, fields: impl IntoIterator<Item = LogField>) -> Self {
        let mut all = self.fields.clone();
        all.extend(fields.into_iter().filter(|f| !f.value.is_empty()));
        Self { fields: all }
    }

    /// Fields attached to this logger, oldest first.
    #[must_use]
    pub fn fields(&self) -> &[LogField] {
        &self.fields
    }

    /// Returns the first value attached under `key`.
    #[must_use]
    pub fn get(&self, key: LogKey) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.key == key)
            .map(|f| f.value.as_str())
    }
}

/// Emits a `tracing` event at `level` carrying every field of a [`Logger`].
///
/// Absent fields are not recorded. Prefer the level-specific macros.
#[macro_export]
macro_rules! log_event {
    ($level:expr, $logger:expr, $($arg:tt)+) => {{
        let logger: &$crate::logging::Logger = &$logger;
        ::tracing::event!(
            $level,
            request_id = logger.get($crate::logging::LogKey::RequestId),
            method = logger.get($crate::logging::LogKey::Method),
            uri = logger.get($crate::logging::LogKey::Uri),
            user_agent = logger.get($crate::logging::LogKey::UserAgent),
            remote_addr = logger.get($crate::logging::LogKey::RemoteAddr),
            remote_user = logger.get($crate::logging::LogKey::RemoteUser),
            referer = logger.get($crate::logging::LogKey::Referer),
            $($arg)+
        )
    }};
}

#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_event!(::tracing::Level::DEBUG, $logger, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_event!(::tracing::Level::INFO, $logger, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_event!(::tracing::Level::WARN, $logger, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_event!(::tracing::Level::ERROR, $logger, $($arg)+)
    };
}

/// Output format of the global subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// One JSON object per record (production).
    #[default]
    Json,
    /// Human-readable multi-line output (development).
    Pretty,
}

impl LogFormat {
    /// Pretty output in development mode, JSON otherwise.
    #[must_use]
    pub fn from_environment() -> Self {
        if is_development() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

/// Whether `EVAL_HUB_DEVELOPMENT` is set to `true` (case-insensitive).
#[must_use]
pub fn is_development() -> bool {
    std::env::var(DEVELOPMENT_ENV_VAR).is_ok_and(|v| v.eq_ignore_ascii_case("true"))
}

/// Installs the global `tracing` subscriber.
///
/// The filter comes from `RUST_LOG` and defaults to `info`. JSON output
/// includes the current span and the full span list so transport spans
/// from the HTTP trace layer appear alongside the request fields.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = match format {
        LogFormat::Json => builder
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_logger_has_no_fields() {
        let logger = Logger::root();
        assert!(logger.fields().is_empty());
        assert!(logger.get(LogKey::RequestId).is_none());
    }

    #[test]
    fn with_appends_without_touching_parent() {
        let base = Logger::root();
        let child = base.with(LogKey::RequestId, "abc");
        let grandchild = child.with(LogKey::Method, "GET");

        assert!(base.fields().is_empty());
        assert_eq!(child.fields(), &[LogField::new(LogKey::RequestId, "abc")]);
        assert_eq!(
            grandchild.fields(),
            &[
                LogField::new(LogKey::RequestId, "abc"),
                LogField::new(LogKey::Method, "GET"),
            ]
        );
    }

    #[test]
    fn empty_values_are_not_attached() {
        let logger = Logger::root()
            .with(LogKey::UserAgent, "")
            .with_fields([
                LogField::new(LogKey::Referer, ""),
                LogField::new(LogKey::Uri, "/x"),
            ]);
        assert_eq!(logger.fields(), &[LogField::new(LogKey::Uri, "/x")]);
    }

    #[test]
    fn repeated_key_keeps_first_value() {
        let logger = Logger::root()
            .with(LogKey::RequestId, "first")
            .with(LogKey::RequestId, "second");
        assert_eq!(logger.get(LogKey::RequestId), Some("first"));
        assert_eq!(logger.fields().len(), 2);
    }

    #[test]
    fn warn_event_carries_fields_under_warn_filter() {
        let logger = Logger::root()
            .with(LogKey::RequestId, "abc-123")
            .with(LogKey::Method, "GET")
            .with(LogKey::Uri, "/api/v1/health");

        let records = test_support::capture_json("warn", || {
            crate::log_info!(logger, "filtered out");
            crate::log_warn!(logger, "slow storage");
            crate::log_error!(logger, "boom");
        });

        assert_eq!(records.len(), 2);
        for record in &records {
            let fields = &record["fields"];
            assert_eq!(fields["request_id"], "abc-123");
            assert_eq!(fields["method"], "GET");
            assert_eq!(fields["uri"], "/api/v1/health");
            assert!(fields.get("user_agent").is_none());
            assert!(fields.get("referer").is_none());
        }
        assert_eq!(records[1]["level"], "ERROR");
        assert_eq!(records[1]["fields"]["message"], "boom");
    }

    #[test]
    fn info_event_carries_fields_under_info_filter() {
        let logger = Logger::root()
            .with(LogKey::RequestId, "tx-9")
            .with(LogKey::Method, "POST")
            .with(LogKey::Uri, "/api/v1/evaluations/jobs")
            .with(LogKey::UserAgent, "curl/8.0");

        let records = test_support::capture_json("info", || {
            crate::log_debug!(logger, "filtered out");
            crate::log_info!(logger, "created job {}", "j1");
        });

        assert_eq!(records.len(), 1);
        let fields = &records[0]["fields"];
        assert_eq!(fields["message"], "created job j1");
        assert_eq!(fields["request_id"], "tx-9");
        assert_eq!(fields["method"], "POST");
        assert_eq!(fields["uri"], "/api/v1/evaluations/jobs");
        assert_eq!(fields["user_agent"], "curl/8.0");
        assert!(fields.get("remote_addr").is_none());
        assert!(fields.get("remote_user").is_none());
    }

    #[test]
    fn event_target_is_the_calling_module() {
        let records = test_support::capture_json("evalhub_server::logging::tests=debug,warn", || {
            crate::log_debug!(Logger::root(), "enabled by module directive");
        });

        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["target"], "evalhub_server::logging::tests");
        assert!(records[0]["fields"].get("request_id").is_none());
    }

    #[test]
    fn log_key_names() {
        let names: Vec<&str> = [
            LogKey::RequestId,
            LogKey::Method,
            LogKey::Uri,
            LogKey::UserAgent,
            LogKey::RemoteAddr,
            LogKey::RemoteUser,
            LogKey::Referer,
        ]
        .into_iter()
        .map(LogKey::as_str)
        .collect();
        assert_eq!(
            names,
            [
                "request_id",
                "method",
                "uri",
                "user_agent",
                "remote_addr",
                "remote_user",
                "referer"
            ]
        );
    }
}
