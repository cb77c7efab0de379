use serde::Serialize;

use super::{AuthError, TokenIssuer};
use crate::database::Store;

/// Name of the account that holds the admin role
pub const ADMIN_NAME: &str = "admin";

/// User context inserted into requests that passed the guard
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AuthUser {
    pub uid: i64,
    pub name: String,
    /// Token version the session was checked against
    #[serde(skip)]
    pub tid: i64,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.name == ADMIN_NAME
    }
}

/// Token decodes, the user still exists and the token version is current
pub async fn authorize_user(
    store: &dyn Store,
    tokens: &TokenIssuer,
    token: Option<&str>,
) -> Result<AuthUser, AuthError> {
    let token = token.ok_or(AuthError::MissingToken)?;
    let claims = tokens.verify(token)?;

    let user = store
        .user_by_id(claims.uid)
        .await?
        .ok_or(AuthError::UnknownUser(claims.uid))?;

    if user.tid != claims.tid {
        return Err(AuthError::StaleToken(user.uid));
    }

    Ok(AuthUser {
        uid: user.uid,
        name: user.name,
        tid: user.tid,
    })
}

/// Same as [`authorize_user`], restricted to the admin account
pub async fn authorize_admin(
    store: &dyn Store,
    tokens: &TokenIssuer,
    token: Option<&str>,
) -> Result<AuthUser, AuthError> {
    let user = authorize_user(store, tokens, token).await?;

    if user.is_admin() {
        Ok(user)
    } else {
        Err(AuthError::NotAdmin(user.uid))
    }
}
