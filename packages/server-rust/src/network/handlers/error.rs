//! API error type and its JSON response mapping.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::response::{IntoResponse, Response};
use axum::Json;
use evalhub_core::{ErrorBody, PatchError};
use http::StatusCode;

use crate::logging::Logger;
use crate::storage::StorageError;

/// Failure of an API call, rendered as `{"detail": ...}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Storage(StorageError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Storage(StorageError::AlreadyExists { .. }) => StatusCode::CONFLICT,
            Self::Storage(StorageError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Storage(StorageError::Backend(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Logs through the request logger and returns `self` for `?`.
    #[must_use]
    pub fn logged(self, logger: &Logger) -> Self {
        let status = self.status().as_u16();
        if self.status().is_server_error() {
            crate::log_error!(logger, status, "request failed: {self}");
        } else {
            crate::log_warn!(logger, status, "request failed: {self}");
        }
        self
    }
}

/// Converts a handler step's error into an [`ApiError`] logged through
/// the request logger.
pub trait ResultExt<T> {
    /// # Errors
    ///
    /// Returns the converted error after logging it.
    fn or_log(self, logger: &Logger) -> Result<T, ApiError>;
}

impl<T, E: Into<ApiError>> ResultExt<T> for Result<T, E> {
    fn or_log(self, logger: &Logger) -> Result<T, ApiError> {
        self.map_err(|err| err.into().logged(logger))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PatchError> for ApiError {
    fn from(err: PatchError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Backend details stay in the logs.
        let detail = match &self {
            Self::Storage(StorageError::Backend(_)) => "internal storage error".to_string(),
            other => other.to_string(),
        };
        (status, Json(ErrorBody { detail })).into_response()
    }
}
