//! HTTP handlers for the evaluation hub API.
//!
//! This module defines [`AppState`] (the shared state carried through axum
//! extractors) and the extractor that turns every domain request into a
//! freshly built [`ExecutionContext`].

pub mod catalog;
pub mod collections;
pub mod error;
pub mod evaluations;
pub mod health;
pub mod system;

pub use catalog::{get_provider, list_benchmarks, list_providers};
pub use collections::{
    create_collection, delete_collection, get_collection, list_collections, patch_collection,
    update_collection,
};
pub use error::{ApiError, ResultExt};
pub use evaluations::{
    cancel_evaluation, create_evaluation, get_evaluation, get_evaluation_summary, list_evaluations,
};
pub use health::{health_handler, status_handler};
pub use system::{not_found_handler, prometheus_handler, system_metrics_handler};

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::FromRequestParts;
use http::request::Parts;
use metrics_exporter_prometheus::PrometheusHandle;

use super::lifecycle::ServiceLifecycle;
use crate::config::Config;
use crate::context::ExecutionContext;
use crate::logging::Logger;
use crate::traits::Storage;

/// Shared application state passed to all axum handlers via `State` extraction.
///
/// Holds `Arc` references to shared resources so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Process-wide base logger; request loggers are derived from it.
    pub logger: Logger,
    pub config: Arc<Config>,
    pub storage: Arc<dyn Storage>,
    pub lifecycle: Arc<ServiceLifecycle>,
    /// Renders `GET /metrics`; `None` when no recorder is installed.
    pub metrics: Option<PrometheusHandle>,
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// State over `storage` with a root logger and no metrics recorder.
    #[must_use]
    pub fn new(config: Arc<Config>, storage: Arc<dyn Storage>) -> Self {
        Self {
            logger: Logger::root(),
            config,
            storage,
            lifecycle: Arc::new(ServiceLifecycle::new()),
            metrics: None,
            start_time: Instant::now(),
        }
    }
}

impl FromRequestParts<AppState> for ExecutionContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(ExecutionContext::new(
            parts,
            &state.logger,
            Arc::clone(&state.config),
        ))
    }
}
