use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use crate::app::AppState;
use crate::database::models::Element;
use crate::error::ApiError;
use crate::handlers::utils::{json_body, require_mid, require_name, MidQuery};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::mail::{parse_address, reservation_mail};
use crate::services::Availability;

#[derive(Debug, Deserialize)]
pub struct ReservationBody {
    pub name: String,
    pub mail: String,
}

/// GET /api/elements - taken and reserved elements
pub async fn get(State(state): State<AppState>) -> ApiResult<Availability> {
    let snapshot = state.availability.snapshot().await?;
    Ok(ApiResponse::success(snapshot.as_ref().clone()))
}

/// POST /api/elements?mid= - reserve an element for a visitor
///
/// The reservation mail goes out before anything is stored; if it can't be
/// sent the element stays available.
pub async fn post(
    State(state): State<AppState>,
    Query(query): Query<MidQuery>,
    body: Result<Json<ReservationBody>, JsonRejection>,
) -> ApiResult<Availability> {
    let mid = require_mid(&state.mids, &query)?;
    let body = json_body(body)?;
    let name = require_name(&body.name)?;
    let mail = parse_address(&body.mail)?.to_string();

    if state.availability.snapshot().await?.is_claimed(mid.as_str()) {
        tracing::info!(mid = %mid.as_str(), "element is already reserved or taken");
        return Err(ApiError::bad_request("element is already reserved or taken"));
    }

    state
        .mailer
        .send(reservation_mail(&mail, &mid, name))
        .await?;

    let element = Element {
        mid: mid.as_str().to_string(),
        name: name.to_string(),
        reservation: Some(Utc::now().naive_utc()),
        mail: Some(mail),
    };
    state.store.insert_element(&element).await?;
    state.availability.invalidate().await;

    tracing::info!(mid = %element.mid, "element reserved");

    let snapshot = state.availability.snapshot().await?;
    Ok(ApiResponse::success(snapshot.as_ref().clone()))
}
