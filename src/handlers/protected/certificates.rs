use axum::{
    extract::{Query, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};

use crate::app::AppState;
use crate::error::ApiError;
use crate::handlers::utils::{require_mid, MidQuery};
use crate::services::CertificateData;

/// GET /api/certificates?mid= - download the certificate of an element
pub async fn get(
    State(state): State<AppState>,
    Query(query): Query<MidQuery>,
) -> Result<Response, ApiError> {
    let mid = require_mid(&state.mids, &query)?;

    let element = state
        .store
        .element(mid.as_str())
        .await?
        .ok_or_else(|| ApiError::not_found("element not found"))?;

    let certificate = state
        .certificates
        .render(&CertificateData::new(&mid, &element.name))
        .await?;
    let pdf = certificate.read().await;
    certificate.cleanup().await;
    let pdf = pdf?;

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"urkunde-{}.pdf\"",
        mid.as_str()
    ))
    .map_err(|_| ApiError::internal_server_error("error while creating certificate"))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf,
    )
        .into_response())
}
