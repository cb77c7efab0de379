use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::auth::{hash_password_async, validate_password, ADMIN_NAME};
use crate::database::models::{NewUser, UserSummary};
use crate::error::ApiError;
use crate::handlers::utils::{json_body, require_name, require_uid, PasswordBody, UidQuery};
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct NewUserBody {
    pub name: String,
    pub password: String,
}

/// GET /api/users - all accounts
pub async fn get(State(state): State<AppState>) -> ApiResult<Vec<UserSummary>> {
    Ok(ApiResponse::success(state.store.list_users().await?))
}

/// POST /api/users - add an account
pub async fn post(
    State(state): State<AppState>,
    body: Result<Json<NewUserBody>, JsonRejection>,
) -> ApiResult<Vec<UserSummary>> {
    let body = json_body(body)?;
    let name = require_name(&body.name)?;
    validate_password(&body.password)?;

    if state.store.user_by_name(name).await?.is_some() {
        tracing::info!(%name, "can't add user: name is taken");
        return Err(ApiError::bad_request("user already exists"));
    }

    state
        .store
        .insert_user(&NewUser {
            name: name.to_string(),
            password: hash_password_async(&body.password).await?,
        })
        .await?;
    tracing::info!(%name, "added user");

    Ok(ApiResponse::success(state.store.list_users().await?))
}

/// PATCH /api/users?uid= - set a new password, ending the user's sessions
pub async fn patch(
    State(state): State<AppState>,
    Query(query): Query<UidQuery>,
    body: Result<Json<PasswordBody>, JsonRejection>,
) -> ApiResult<Vec<UserSummary>> {
    let uid = require_uid(&query)?;
    let body = json_body(body)?;
    validate_password(&body.password)?;

    if state.store.user_by_id(uid).await?.is_none() {
        return Err(ApiError::bad_request("user doesn't exist"));
    }

    let hash = hash_password_async(&body.password).await?;
    state.store.change_password(uid, &hash).await?;
    tracing::info!(uid, "password reset by admin");

    Ok(ApiResponse::success(state.store.list_users().await?))
}

/// DELETE /api/users?uid= - remove an account
pub async fn delete(
    State(state): State<AppState>,
    Query(query): Query<UidQuery>,
) -> ApiResult<Vec<UserSummary>> {
    let uid = require_uid(&query)?;

    if let Some(user) = state.store.user_by_id(uid).await? {
        if user.name == ADMIN_NAME {
            return Err(ApiError::bad_request("the admin account can't be deleted"));
        }
    }

    let affected = state.store.delete_user(uid).await?;
    tracing::info!(uid, affected, "deleted user");

    Ok(ApiResponse::success(state.store.list_users().await?))
}
