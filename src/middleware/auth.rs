use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::time::Duration;

use crate::app::AppState;
use crate::auth::{authorize_admin, authorize_user, AuthError, AuthUser, TokenIssuer};
use crate::error::ApiError;

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "session";

/// Session cookie holding `token` for `ttl`
pub fn session_cookie(token: String, ttl: Duration) -> Cookie<'static> {
    let max_age = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);

    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(time::Duration::seconds(max_age))
        .build()
}

/// Session token sent by the browser, if any
pub fn session_token(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

/// Adds a freshly issued token for `user` to the jar
pub fn start_session(
    jar: CookieJar,
    tokens: &TokenIssuer,
    user: &AuthUser,
) -> Result<CookieJar, ApiError> {
    let token = tokens.issue(user.uid, user.tid)?;
    Ok(jar.add(session_cookie(token, tokens.ttl())))
}

/// Tells the browser to drop the session cookie, whether it sent one or not
pub fn end_session(jar: CookieJar) -> CookieJar {
    let mut removal = session_cookie(String::new(), Duration::ZERO);
    removal.make_removal();
    jar.add(removal)
}

/// Runs after the guard: hands the user to the handler and slides the session
async fn continue_as(
    state: &AppState,
    user: AuthUser,
    mut request: Request,
    next: Next,
) -> Response {
    request.extensions_mut().insert(user.clone());
    let response = next.run(request).await;

    // handlers that end or replace the session set their own cookie
    if response.headers().contains_key(header::SET_COOKIE) {
        return response;
    }

    match start_session(CookieJar::new(), &state.tokens, &user) {
        Ok(jar) => (jar, response).into_response(),
        Err(e) => {
            tracing::warn!(uid = user.uid, "can't refresh session: {}", e);
            response
        }
    }
}

fn reject(err: AuthError, had_token: bool) -> Response {
    let forget = had_token && !matches!(err, AuthError::Database(_));
    let error = ApiError::from(err);
    if forget {
        (end_session(CookieJar::new()), error).into_response()
    } else {
        error.into_response()
    }
}

/// Guard for routes open to every logged-in user
pub async fn require_user(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let token = session_token(&jar);

    match authorize_user(state.store.as_ref(), &state.tokens, token.as_deref()).await {
        Ok(user) => continue_as(&state, user, request, next).await,
        Err(err) => reject(err, token.is_some()),
    }
}

/// Guard for routes reserved to the admin account
pub async fn require_admin(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let token = session_token(&jar);

    match authorize_admin(state.store.as_ref(), &state.tokens, token.as_deref()).await {
        Ok(user) => continue_as(&state, user, request, next).await,
        // a valid non-admin session stays valid
        Err(err @ AuthError::NotAdmin(_)) => reject(err, false),
        Err(err) => reject(err, token.is_some()),
    }
}
