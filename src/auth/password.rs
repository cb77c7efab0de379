use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use once_cell::sync::Lazy;

use super::AuthError;

pub const PASSWORD_MIN_LENGTH: usize = 12;
pub const PASSWORD_MAX_LENGTH: usize = 64;

pub fn validate_password(password: &str) -> Result<(), AuthError> {
    let len = password.chars().count();
    if (PASSWORD_MIN_LENGTH..=PASSWORD_MAX_LENGTH).contains(&len) {
        Ok(())
    } else {
        Err(AuthError::WeakPassword {
            min: PASSWORD_MIN_LENGTH,
            max: PASSWORD_MAX_LENGTH,
        })
    }
}

/// Hash a password into an Argon2id PHC string
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::HashingFailed)
}

/// An unparseable stored hash never matches
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("stored password hash can't be parsed: {}", e);
            false
        }
    }
}

/// Stand-in checked when the user doesn't exist, same parameters as real hashes
static UNKNOWN_USER_HASH: Lazy<Option<String>> =
    Lazy::new(|| hash_password("unknown user placeholder").ok());

/// [`hash_password`] on the blocking pool
pub async fn hash_password_async(password: &str) -> Result<String, AuthError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| {
            tracing::error!("password hashing task failed: {}", e);
            AuthError::HashingFailed
        })?
}

/// Checks a login on the blocking pool. A missing user costs one Argon2
/// verification just like a wrong password, and never matches.
pub async fn verify_login(password: &str, stored_hash: Option<&str>) -> bool {
    let password = password.to_string();
    let known = stored_hash.is_some();
    let hash = match stored_hash {
        Some(hash) => hash.to_string(),
        None => match UNKNOWN_USER_HASH.as_deref() {
            Some(hash) => hash.to_string(),
            None => return false,
        },
    };

    match tokio::task::spawn_blocking(move || verify_password(&password, &hash)).await {
        Ok(matched) => known && matched,
        Err(e) => {
            tracing::error!("password verification task failed: {}", e);
            false
        }
    }
}
