use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};

use crate::app::AppState;
use crate::error::ApiError;
use crate::handlers::utils::{json_body, require_mid, require_name, MidQuery, NameBody};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{Availability, Mnemonic};

/// Renames an existing element and drops the cached snapshot
pub(super) async fn rename(state: &AppState, mid: &Mnemonic, name: &str) -> Result<(), ApiError> {
    let affected = state.store.rename_element(mid.as_str(), name).await?;
    if affected == 0 {
        return Err(ApiError::not_found("element not found"));
    }

    state.availability.invalidate().await;
    tracing::debug!(mid = %mid.as_str(), "renamed element");
    Ok(())
}

/// Deletes an element; deleting a missing element is not an error
pub(super) async fn remove(state: &AppState, mid: &Mnemonic) -> Result<(), ApiError> {
    let affected = state.store.delete_element(mid.as_str()).await?;
    state.availability.invalidate().await;

    tracing::debug!(mid = %mid.as_str(), affected, "deleted element");
    Ok(())
}

/// PATCH /api/elements?mid= - rename an element
pub async fn patch(
    State(state): State<AppState>,
    Query(query): Query<MidQuery>,
    body: Result<Json<NameBody>, JsonRejection>,
) -> ApiResult<Availability> {
    let mid = require_mid(&state.mids, &query)?;
    let body = json_body(body)?;

    rename(&state, &mid, require_name(&body.name)?).await?;

    let snapshot = state.availability.snapshot().await?;
    Ok(ApiResponse::success(snapshot.as_ref().clone()))
}

/// DELETE /api/elements?mid= - free an element
pub async fn delete(
    State(state): State<AppState>,
    Query(query): Query<MidQuery>,
) -> ApiResult<Availability> {
    let mid = require_mid(&state.mids, &query)?;

    remove(&state, &mid).await?;

    let snapshot = state.availability.snapshot().await?;
    Ok(ApiResponse::success(snapshot.as_ref().clone()))
}
