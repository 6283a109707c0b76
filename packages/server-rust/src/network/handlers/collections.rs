//! Collection endpoints under `/api/v1/evaluations/collections`.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use evalhub_core::{
    apply_patch, clamp_limit, CollectionConfig, CollectionResource, CollectionResourceList, Page,
    Patch, Resource, Tenant,
};
use serde::Deserialize;
use uuid::Uuid;

use super::error::{ApiError, ResultExt};
use super::AppState;
use crate::context::ExecutionContext;

#[derive(Debug, Default, Deserialize)]
pub struct CollectionListParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CollectionParams {
    #[serde(default)]
    pub summary: bool,
}

/// `POST /api/v1/evaluations/collections` (201)
pub async fn create_collection(
    ctx: ExecutionContext,
    State(state): State<AppState>,
    payload: Result<Json<CollectionConfig>, JsonRejection>,
) -> Result<(StatusCode, Json<CollectionResource>), ApiError> {
    let Json(config) = payload.or_log(&ctx.logger)?;
    let collection = CollectionResource {
        resource: Resource::new(Uuid::new_v4().to_string(), Tenant::default()),
        config,
    };
    state
        .storage
        .create_collection(&collection)
        .await
        .or_log(&ctx.logger)?;

    crate::log_info!(ctx.logger, "created collection {}", collection.resource.id);
    Ok((StatusCode::CREATED, Json(collection)))
}

/// `GET /api/v1/evaluations/collections`
pub async fn list_collections(
    ctx: ExecutionContext,
    State(state): State<AppState>,
    params: Result<Query<CollectionListParams>, QueryRejection>,
) -> Result<Json<CollectionResourceList>, ApiError> {
    let Query(params) = params.or_log(&ctx.logger)?;
    let limit = clamp_limit(params.limit);
    let offset = params.offset.unwrap_or_default();
    let listing = state
        .storage
        .get_collections(limit, offset)
        .await
        .or_log(&ctx.logger)?;

    Ok(Json(CollectionResourceList {
        page: Page::new(&ctx.href(), limit, offset, listing.total_count),
        items: listing.items,
    }))
}

/// `GET /api/v1/evaluations/collections/{id}` (`?summary=true` drops benchmarks)
pub async fn get_collection(
    ctx: ExecutionContext,
    State(state): State<AppState>,
    Path(id): Path<String>,
    params: Result<Query<CollectionParams>, QueryRejection>,
) -> Result<Json<CollectionResource>, ApiError> {
    let Query(params) = params.or_log(&ctx.logger)?;
    let collection = state
        .storage
        .get_collection(&id, params.summary)
        .await
        .or_log(&ctx.logger)?;
    Ok(Json(collection))
}

/// `PUT /api/v1/evaluations/collections/{id}` -- replaces the definition.
pub async fn update_collection(
    ctx: ExecutionContext,
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<CollectionConfig>, JsonRejection>,
) -> Result<Json<CollectionResource>, ApiError> {
    let Json(config) = payload.or_log(&ctx.logger)?;
    let mut collection = state
        .storage
        .get_collection(&id, false)
        .await
        .or_log(&ctx.logger)?;

    collection.config = config;
    collection.resource.touch();
    state
        .storage
        .update_collection(&collection)
        .await
        .or_log(&ctx.logger)?;
    Ok(Json(collection))
}

/// `PATCH /api/v1/evaluations/collections/{id}` -- applies a JSON patch to
/// the collection definition. A failing operation leaves it unchanged.
pub async fn patch_collection(
    ctx: ExecutionContext,
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Patch>, JsonRejection>,
) -> Result<Json<CollectionResource>, ApiError> {
    let Json(patch) = payload.or_log(&ctx.logger)?;
    let mut collection = state
        .storage
        .get_collection(&id, false)
        .await
        .or_log(&ctx.logger)?;

    collection.config = patched(&collection.config, &patch).or_log(&ctx.logger)?;
    collection.resource.touch();
    state
        .storage
        .update_collection(&collection)
        .await
        .or_log(&ctx.logger)?;
    Ok(Json(collection))
}

fn patched(config: &CollectionConfig, patch: &Patch) -> Result<CollectionConfig, ApiError> {
    let mut document = serde_json::to_value(config)
        .map_err(|err| ApiError::BadRequest(err.to_string()))?;
    apply_patch(&mut document, patch)?;
    serde_json::from_value(document)
        .map_err(|err| ApiError::BadRequest(format!("patched collection is invalid: {err}")))
}

/// `DELETE /api/v1/evaluations/collections/{id}` (204)
pub async fn delete_collection(
    ctx: ExecutionContext,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .storage
        .delete_collection(&id)
        .await
        .or_log(&ctx.logger)?;
    crate::log_info!(ctx.logger, "deleted collection {id}");
    Ok(StatusCode::NO_CONTENT)
}
