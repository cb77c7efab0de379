use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::auth::{authorize_user, verify_login, AuthError, AuthUser};
use crate::error::ApiError;
use crate::handlers::utils::json_body;
use crate::middleware::{end_session, session_token, start_session, ApiResponse};

const WRONG_LOGIN: &str = "unknown user or wrong password";

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub user: String,
    pub password: String,
}

/// Logged-in status reported to the frontend
#[derive(Debug, Serialize)]
pub struct UserLogin {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub logged_in: bool,
}

impl UserLogin {
    fn logged_in(user: &AuthUser) -> Self {
        Self {
            uid: Some(user.uid),
            name: Some(user.name.clone()),
            logged_in: true,
        }
    }

    fn logged_out() -> Self {
        Self {
            uid: None,
            name: None,
            logged_in: false,
        }
    }
}

/// GET /api/welcome - report the session of the caller, 204 if there is none
pub async fn welcome(State(state): State<AppState>, jar: CookieJar) -> Result<Response, ApiError> {
    let token = session_token(&jar);

    match authorize_user(state.store.as_ref(), &state.tokens, token.as_deref()).await {
        Ok(user) => {
            tracing::debug!(uid = user.uid, "welcomed user");
            let jar = start_session(jar, &state.tokens, &user)?;
            Ok((jar, ApiResponse::success(UserLogin::logged_in(&user))).into_response())
        }
        Err(err @ AuthError::Database(_)) => Err(err.into()),
        Err(err) if token.is_some() => {
            tracing::debug!("welcome with rejected session: {}", err);
            Ok((end_session(jar), ApiResponse::no_content()).into_response())
        }
        Err(_) => Ok(ApiResponse::no_content().into_response()),
    }
}

/// POST /api/login - check the credentials and start a session
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Result<Json<LoginBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let body = json_body(body)?;

    let stored = state.store.user_by_name(&body.user).await?;
    let stored_hash = stored.as_ref().map(|user| user.password.as_str());
    if !verify_login(&body.password, stored_hash).await {
        match &stored {
            Some(user) => tracing::info!(uid = user.uid, "login with wrong password"),
            None => tracing::info!(name = %body.user, "login for unknown user"),
        }
        return Err(ApiError::unauthorized(WRONG_LOGIN));
    }
    let Some(user) = stored else {
        return Err(ApiError::unauthorized(WRONG_LOGIN));
    };

    let user = AuthUser {
        uid: user.uid,
        name: user.name,
        tid: user.tid,
    };
    let jar = start_session(jar, &state.tokens, &user)?;

    tracing::info!(uid = user.uid, "user logged in");
    Ok((jar, ApiResponse::success(UserLogin::logged_in(&user))).into_response())
}

/// GET /api/logout - drop the session cookie
pub async fn logout(jar: CookieJar) -> Response {
    (end_session(jar), ApiResponse::success(UserLogin::logged_out())).into_response()
}
