//! Health and status endpoint handlers.

use std::collections::BTreeMap;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use evalhub_core::{EvaluationJobState, HealthResponse};
use serde_json::{json, Value};

use super::AppState;
use crate::context::ExecutionContext;
use crate::storage::JobQuery;

const STORAGE_PING_TIMEOUT: Duration = Duration::from_secs(1);

/// `GET /api/v1/health`
///
/// Returns 200 with `"healthy"` when storage answers a ping, otherwise 503
/// with `"unhealthy"` and the storage error under `components.storage`.
pub async fn health_handler(
    ctx: ExecutionContext,
    State(state): State<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let mut storage = BTreeMap::from([(
        "datasource".to_string(),
        Value::String(state.storage.datasource_name().to_string()),
    )]);

    let healthy = match state.storage.ping(STORAGE_PING_TIMEOUT).await {
        Ok(()) => {
            storage.insert("status".to_string(), json!("healthy"));
            true
        }
        Err(err) => {
            crate::log_warn!(ctx.logger, "storage health check failed: {err}");
            storage.insert("status".to_string(), json!("unhealthy"));
            storage.insert("error".to_string(), json!(err.to_string()));
            false
        }
    };

    let running = JobQuery {
        summary: true,
        limit: 0,
        status: Some(EvaluationJobState::Running),
        ..JobQuery::default()
    };
    let active_evaluations = if healthy {
        state
            .storage
            .get_evaluation_jobs(&running)
            .await
            .ok()
            .map(|listing| listing.total_count)
    } else {
        None
    };

    let (status, label) = if healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    let body = HealthResponse {
        status: label.to_string(),
        version: state.config.build.version.clone(),
        timestamp: Some(Utc::now()),
        components: BTreeMap::from([("storage".to_string(), storage)]),
        uptime_seconds: state.start_time.elapsed().as_secs_f64(),
        active_evaluations,
    };
    (status, Json(body))
}

/// `GET /api/v1/status` -- lifecycle state and build metadata.
pub async fn status_handler(State(state): State<AppState>) -> Json<Value> {
    let build = &state.config.build;
    Json(json!({
        "state": state.lifecycle.state().as_str(),
        "version": build.version,
        "build": build.build,
        "build_date": build.build_date,
        "uptime_seconds": state.start_time.elapsed().as_secs(),
    }))
}
