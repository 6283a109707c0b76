//! System metrics, Prometheus exposition and the JSON 404 fallback.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use evalhub_core::EvaluationJobState;
use serde_json::{json, Value};

use super::error::{ApiError, ResultExt};
use super::AppState;
use crate::context::ExecutionContext;
use crate::storage::JobQuery;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// `GET /api/v1/metrics/system` -- job counts by state and uptime.
pub async fn system_metrics_handler(
    ctx: ExecutionContext,
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    let mut jobs = BTreeMap::new();
    let mut total = 0;
    for job_state in EvaluationJobState::ALL {
        let query = JobQuery {
            summary: true,
            limit: 0,
            status: Some(job_state),
            ..JobQuery::default()
        };
        let count = state
            .storage
            .get_evaluation_jobs(&query)
            .await
            .or_log(&ctx.logger)?
            .total_count;
        total += count;
        jobs.insert(job_state.as_str(), count);
    }

    Ok(Json(json!({
        "evaluation_jobs": { "total": total, "by_state": jobs },
        "datasource": state.storage.datasource_name(),
        "state": state.lifecycle.state().as_str(),
        "uptime_seconds": state.start_time.elapsed().as_secs(),
    })))
}

/// `GET /metrics` -- Prometheus text format.
pub async fn prometheus_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
            handle.render(),
        )
            .into_response(),
        None => ApiError::NotFound("metrics recorder not installed".to_string()).into_response(),
    }
}

/// Fallback for unknown paths.
pub async fn not_found_handler(ctx: ExecutionContext) -> ApiError {
    ApiError::NotFound(format!("no route for {} {}", ctx.method, ctx.uri)).logged(&ctx.logger)
}
