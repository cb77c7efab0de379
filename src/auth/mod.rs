use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub mod guard;
pub mod password;

pub use guard::{authorize_admin, authorize_user, AuthUser, ADMIN_NAME};
pub use password::{
    hash_password, hash_password_async, validate_password, verify_login, verify_password,
};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing session token")]
    MissingToken,

    #[error("invalid session token: {0}")]
    InvalidToken(String),

    #[error("unknown user {0}")]
    UnknownUser(i64),

    #[error("stale token version for user {0}")]
    StaleToken(i64),

    #[error("user {0} is not the admin")]
    NotAdmin(i64),

    #[error("token generation failed: {0}")]
    TokenGeneration(String),

    #[error("password hashing failed")]
    HashingFailed,

    #[error("password must be between {min} and {max} characters")]
    WeakPassword { min: usize, max: usize },

    #[error(transparent)]
    Database(#[from] crate::database::DatabaseError),
}

/// Claims of a session token: the user and the token version it was issued for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub uid: i64,
    pub tid: i64,
    pub iat: i64,
    pub exp: i64,
}

/// Mints and verifies HS256 session tokens
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: Arc<EncodingKey>,
    decoding: Arc<DecodingKey>,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, uid: i64, tid: i64) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            uid,
            tid,
            iat: now,
            exp: now + self.ttl.as_secs() as i64,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::TokenGeneration(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::MissingToken);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}
