use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};

use super::elements::{remove, rename};
use crate::app::AppState;
use crate::database::models::Sponsorship;
use crate::handlers::utils::{json_body, require_mid, require_name, MidQuery, NameBody};
use crate::middleware::{ApiResponse, ApiResult};

/// GET /api/sponsorships - confirmed sponsorships
pub async fn get(State(state): State<AppState>) -> ApiResult<Vec<Sponsorship>> {
    Ok(ApiResponse::success(state.store.sponsored_elements().await?))
}

/// PATCH /api/sponsorships?mid= - correct the sponsor name
pub async fn patch(
    State(state): State<AppState>,
    Query(query): Query<MidQuery>,
    body: Result<Json<NameBody>, JsonRejection>,
) -> ApiResult<Vec<Sponsorship>> {
    let mid = require_mid(&state.mids, &query)?;
    let body = json_body(body)?;

    rename(&state, &mid, require_name(&body.name)?).await?;

    Ok(ApiResponse::success(state.store.sponsored_elements().await?))
}

/// DELETE /api/sponsorships?mid= - end a sponsorship
pub async fn delete(
    State(state): State<AppState>,
    Query(query): Query<MidQuery>,
) -> ApiResult<Vec<Sponsorship>> {
    let mid = require_mid(&state.mids, &query)?;

    remove(&state, &mid).await?;

    Ok(ApiResponse::success(state.store.sponsored_elements().await?))
}
