//! Evaluation job endpoints under `/api/v1/evaluations/jobs`.
//!
//! Jobs are recorded as `pending` and never executed here; cancellation
//! only changes their stored state.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use evalhub_core::{
    clamp_limit, EvaluationJobConfig, EvaluationJobResource, EvaluationJobResourceList,
    EvaluationJobState, Page, Resource, Tenant,
};
use serde::Deserialize;
use uuid::Uuid;

use super::error::{ApiError, ResultExt};
use super::AppState;
use crate::context::ExecutionContext;
use crate::storage::JobQuery;

#[derive(Debug, Default, Deserialize)]
pub struct JobListParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub status: Option<String>,
    #[serde(default)]
    pub summary: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteParams {
    #[serde(default)]
    pub hard_delete: bool,
}

/// `POST /api/v1/evaluations/jobs` -- records a pending job (202).
///
/// Missing `timeout_minutes`/`retry_attempts` are filled from the
/// execution context defaults.
pub async fn create_evaluation(
    ctx: ExecutionContext,
    State(state): State<AppState>,
    payload: Result<Json<EvaluationJobConfig>, JsonRejection>,
) -> Result<(StatusCode, Json<EvaluationJobResource>), ApiError> {
    let Json(mut config) = payload.or_log(&ctx.logger)?;
    config.timeout_minutes.get_or_insert(ctx.timeout_minutes);
    config.retry_attempts.get_or_insert(ctx.retry_attempts);

    let job = EvaluationJobResource::new(
        Resource::new(Uuid::new_v4().to_string(), Tenant::default()),
        config,
    );
    state
        .storage
        .create_evaluation_job(&job)
        .await
        .or_log(&ctx.logger)?;

    crate::log_info!(
        ctx.logger,
        "created evaluation job {} with {} benchmark(s)",
        job.resource.id,
        job.config.benchmarks.len()
    );
    Ok((StatusCode::ACCEPTED, Json(job)))
}

/// `GET /api/v1/evaluations/jobs` -- paged list, oldest first.
pub async fn list_evaluations(
    ctx: ExecutionContext,
    State(state): State<AppState>,
    params: Result<Query<JobListParams>, QueryRejection>,
) -> Result<Json<EvaluationJobResourceList>, ApiError> {
    let Query(params) = params.or_log(&ctx.logger)?;
    let status = params
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::parse::<EvaluationJobState>)
        .transpose()
        .map_err(|err| ApiError::BadRequest(err.to_string()))
        .or_log(&ctx.logger)?;

    let query = JobQuery {
        summary: params.summary,
        limit: clamp_limit(params.limit),
        offset: params.offset.unwrap_or_default(),
        status,
    };
    let listing = state
        .storage
        .get_evaluation_jobs(&query)
        .await
        .or_log(&ctx.logger)?;

    let mut href = ctx.href();
    if let Some(status) = status {
        href.push_str(&format!("?status={status}"));
    }
    Ok(Json(EvaluationJobResourceList {
        page: Page::new(&href, query.limit, query.offset, listing.total_count),
        items: listing.items,
    }))
}

/// `GET /api/v1/evaluations/jobs/{id}`
pub async fn get_evaluation(
    ctx: ExecutionContext,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EvaluationJobResource>, ApiError> {
    let job = state
        .storage
        .get_evaluation_job(&id)
        .await
        .or_log(&ctx.logger)?;
    Ok(Json(job))
}

/// `GET /api/v1/evaluations/jobs/{id}/summary`
pub async fn get_evaluation_summary(
    ctx: ExecutionContext,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EvaluationJobResource>, ApiError> {
    let job = state
        .storage
        .get_evaluation_job(&id)
        .await
        .or_log(&ctx.logger)?;
    Ok(Json(job.summary()))
}

/// `DELETE /api/v1/evaluations/jobs/{id}` -- cancels, or removes with
/// `?hard_delete=true` (204).
pub async fn cancel_evaluation(
    ctx: ExecutionContext,
    State(state): State<AppState>,
    Path(id): Path<String>,
    params: Result<Query<DeleteParams>, QueryRejection>,
) -> Result<StatusCode, ApiError> {
    let Query(params) = params.or_log(&ctx.logger)?;
    state
        .storage
        .delete_evaluation_job(&id, params.hard_delete)
        .await
        .or_log(&ctx.logger)?;

    let action = if params.hard_delete { "deleted" } else { "cancelled" };
    crate::log_info!(ctx.logger, "{action} evaluation job {id}");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use http::Method;
    use serde_json::json;

    use super::super::test_support::{json, router, send, state};

    fn job_body() -> serde_json::Value {
        json!({
            "model": { "url": "http://model:8000", "name": "granite" },
            "benchmarks": [
                { "id": "mmlu", "provider_id": "lm_eval" },
                { "id": "hellaswag", "provider_id": "lm_eval" }
            ]
        })
    }

    #[tokio::test]
    async fn create_returns_accepted_pending_job_with_defaults() {
        let state = state();
        let router = router(&state);

        let response = send(&router, Method::POST, "/api/v1/evaluations/jobs", Some(job_body())).await;
        assert_eq!(response.status(), 202);
        let job = json(response).await;

        assert_eq!(job["status"]["state"], "pending");
        assert_eq!(job["timeout_minutes"], 60);
        assert_eq!(job["retry_attempts"], 3);
        assert_eq!(job["status"]["benchmarks"].as_array().unwrap().len(), 2);
        assert!(uuid::Uuid::parse_str(job["id"].as_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn explicit_timeout_is_kept() {
        let state = state();
        let router = router(&state);
        let mut body = job_body();
        body["timeout_minutes"] = json!(5);

        let job = json(send(&router, Method::POST, "/api/v1/evaluations/jobs", Some(body)).await).await;
        assert_eq!(job["timeout_minutes"], 5);
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request_with_detail() {
        let state = state();
        let router = router(&state);
        let response = send(
            &router,
            Method::POST,
            "/api/v1/evaluations/jobs",
            Some(json!({ "benchmarks": [] })),
        )
        .await;
        assert_eq!(response.status(), 400);
        assert!(json(response).await["detail"].is_string());
    }

    #[tokio::test]
    async fn get_summary_and_cancel() {
        let state = state();
        let router = router(&state);
        let created = json(send(&router, Method::POST, "/api/v1/evaluations/jobs", Some(job_body())).await).await;
        let id = created["id"].as_str().unwrap();
        let path = format!("/api/v1/evaluations/jobs/{id}");

        let fetched = json(send(&router, Method::GET, &path, None).await).await;
        assert_eq!(fetched["id"], id);

        let summary = json(send(&router, Method::GET, &format!("{path}/summary"), None).await).await;
        assert_eq!(summary["benchmarks"], json!([]));
        assert!(summary["status"].get("benchmarks").is_none());

        let response = send(&router, Method::DELETE, &path, None).await;
        assert_eq!(response.status(), 204);
        let cancelled = json(send(&router, Method::GET, &path, None).await).await;
        assert_eq!(cancelled["status"]["state"], "cancelled");

        let response = send(&router, Method::DELETE, &format!("{path}?hard_delete=true"), None).await;
        assert_eq!(response.status(), 204);
        let response = send(&router, Method::GET, &path, None).await;
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn list_pages_with_links_from_base_url() {
        let state = state();
        let router = router(&state);
        for _ in 0..3 {
            send(&router, Method::POST, "/api/v1/evaluations/jobs", Some(job_body())).await;
        }

        let page = json(send(&router, Method::GET, "/api/v1/evaluations/jobs?limit=2", None).await).await;
        assert_eq!(page["total_count"], 3);
        assert_eq!(page["limit"], 2);
        assert_eq!(page["items"].as_array().unwrap().len(), 2);
        assert_eq!(
            page["first"]["href"],
            "http://eval.example.com/api/v1/evaluations/jobs?limit=2&offset=0"
        );
        assert_eq!(
            page["next"]["href"],
            "http://eval.example.com/api/v1/evaluations/jobs?limit=2&offset=2"
        );
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let state = state();
        let router = router(&state);
        send(&router, Method::POST, "/api/v1/evaluations/jobs", Some(job_body())).await;

        let page = json(send(&router, Method::GET, "/api/v1/evaluations/jobs?status=running", None).await).await;
        assert_eq!(page["total_count"], 0);
        assert_eq!(
            page["first"]["href"],
            "http://eval.example.com/api/v1/evaluations/jobs?status=running&limit=50&offset=0"
        );

        let response = send(&router, Method::GET, "/api/v1/evaluations/jobs?status=bogus", None).await;
        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn unknown_job_is_404() {
        let state = state();
        let router = router(&state);
        let response = send(&router, Method::GET, "/api/v1/evaluations/jobs/missing", None).await;
        assert_eq!(response.status(), 404);
        assert_eq!(json(response).await["detail"], "evaluation job missing not found");
    }
}
