use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};

use super::elements::{remove, rename};
use crate::app::AppState;
use crate::database::models::Element;
use crate::error::ApiError;
use crate::handlers::utils::{json_body, require_mid, require_name, MidQuery, NameBody};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{certificate_mail, CertificateData};

/// GET /api/reservations - pending reservations
pub async fn get(State(state): State<AppState>) -> ApiResult<Vec<Element>> {
    Ok(ApiResponse::success(state.store.reserved_elements().await?))
}

/// POST /api/reservations?mid= - confirm a sponsorship
///
/// The certificate is rendered first and the confirmation stored in one
/// update. Mailing the certificate happens afterwards: if it fails the
/// confirmation stands and the certificate can be fetched again from
/// `GET /api/certificates`.
pub async fn post(
    State(state): State<AppState>,
    Query(query): Query<MidQuery>,
) -> ApiResult<Vec<Element>> {
    let mid = require_mid(&state.mids, &query)?;

    let element = state
        .store
        .element(mid.as_str())
        .await?
        .filter(Element::is_reserved)
        .ok_or_else(|| {
            tracing::info!(mid = %mid.as_str(), "no reservation to confirm");
            ApiError::not_found("no reservation found")
        })?;

    let certificate = state
        .certificates
        .render(&CertificateData::new(&mid, &element.name))
        .await?;

    match state.store.confirm_element(mid.as_str()).await {
        Ok(0) => {
            // removed between the lookup and the update
            certificate.cleanup().await;
            return Err(ApiError::not_found("no reservation found"));
        }
        Ok(_) => {}
        Err(e) => {
            certificate.cleanup().await;
            return Err(e.into());
        }
    }
    state.availability.invalidate().await;
    tracing::info!(mid = %mid.as_str(), "sponsorship confirmed");

    match (&element.mail, certificate.read().await) {
        (Some(to), Ok(pdf)) => {
            if let Err(e) = state
                .mailer
                .send(certificate_mail(to, &mid, &element.name, pdf))
                .await
            {
                tracing::warn!(mid = %mid.as_str(), "can't send certificate: {}", e);
            }
        }
        (None, _) => tracing::warn!(mid = %mid.as_str(), "reservation has no mail address"),
        (_, Err(e)) => tracing::warn!(mid = %mid.as_str(), "can't read certificate: {}", e),
    }
    certificate.cleanup().await;

    Ok(ApiResponse::success(state.store.reserved_elements().await?))
}

/// PATCH /api/reservations?mid= - correct the name of a reservation
pub async fn patch(
    State(state): State<AppState>,
    Query(query): Query<MidQuery>,
    body: Result<Json<NameBody>, JsonRejection>,
) -> ApiResult<Vec<Element>> {
    let mid = require_mid(&state.mids, &query)?;
    let body = json_body(body)?;

    rename(&state, &mid, require_name(&body.name)?).await?;

    Ok(ApiResponse::success(state.store.reserved_elements().await?))
}

/// DELETE /api/reservations?mid= - drop a reservation
pub async fn delete(
    State(state): State<AppState>,
    Query(query): Query<MidQuery>,
) -> ApiResult<Vec<Element>> {
    let mid = require_mid(&state.mids, &query)?;

    remove(&state, &mid).await?;

    Ok(ApiResponse::success(state.store.reserved_elements().await?))
}
