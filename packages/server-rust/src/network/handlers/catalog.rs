//! Read-only benchmark and provider catalog, served from configuration.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use evalhub_core::{BenchmarkFilter, BenchmarksList, Provider, ProviderList};

use super::error::{ApiError, ResultExt};
use super::AppState;
use crate::context::ExecutionContext;

/// `GET /api/v1/evaluations/benchmarks` (`?provider_id=..&category=..`)
pub async fn list_benchmarks(
    ctx: ExecutionContext,
    State(state): State<AppState>,
    filter: Result<Query<BenchmarkFilter>, QueryRejection>,
) -> Result<Json<BenchmarksList>, ApiError> {
    let Query(filter) = filter.or_log(&ctx.logger)?;
    let items: Vec<_> = state
        .config
        .benchmarks
        .iter()
        .filter(|b| filter.matches(b))
        .cloned()
        .collect();
    Ok(Json(BenchmarksList {
        total_count: items.len(),
        items,
    }))
}

/// `GET /api/v1/evaluations/providers`
pub async fn list_providers(State(state): State<AppState>) -> Json<ProviderList> {
    Json(ProviderList {
        total_count: state.config.providers.len(),
        items: state.config.providers.clone(),
    })
}

/// `GET /api/v1/evaluations/providers/{id}`
pub async fn get_provider(
    ctx: ExecutionContext,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Provider>, ApiError> {
    state
        .config
        .providers
        .iter()
        .find(|p| p.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("provider {id} not found")))
        .or_log(&ctx.logger)
}
