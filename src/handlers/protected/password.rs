use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    Extension, Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;

use crate::app::AppState;
use crate::auth::{hash_password_async, validate_password, AuthUser};
use crate::error::ApiError;
use crate::handlers::utils::{json_body, PasswordBody};
use crate::middleware::{end_session, ApiResponse};

/// PATCH /api/user/password - change the password of the caller
///
/// Every session of the user ends, including the current one.
pub async fn patch(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
    body: Result<Json<PasswordBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let body = json_body(body)?;
    validate_password(&body.password)?;

    let hash = hash_password_async(&body.password).await?;
    if state.store.change_password(user.uid, &hash).await? == 0 {
        return Err(ApiError::unauthorized("unauthorized"));
    }
    tracing::info!(uid = user.uid, "password changed");

    Ok((end_session(jar), ApiResponse::success(json!({ "logged_in": false }))).into_response())
}
