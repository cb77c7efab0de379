use axum::{extract::rejection::JsonRejection, Json};
use serde::Deserialize;

use crate::error::ApiError;
use crate::services::{MidValidator, Mnemonic};

#[derive(Debug, Default, Deserialize)]
pub struct MidQuery {
    pub mid: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UidQuery {
    pub uid: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NameBody {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordBody {
    pub password: String,
}

/// Unwraps a JSON body, turning any rejection into a 400
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match body {
        Ok(Json(body)) => Ok(body),
        Err(rejection) => {
            tracing::info!("can't parse message-body: {}", rejection.body_text());
            Err(ApiError::invalid_json("invalid message-body"))
        }
    }
}

pub fn require_mid(mids: &MidValidator, query: &MidQuery) -> Result<Mnemonic, ApiError> {
    let mid = query
        .mid
        .as_deref()
        .filter(|mid| !mid.is_empty())
        .ok_or_else(|| ApiError::bad_request("query doesn't include mid"))?;

    Ok(mids.parse(mid)?)
}

pub fn require_uid(query: &UidQuery) -> Result<i64, ApiError> {
    query
        .uid
        .as_deref()
        .and_then(|uid| uid.parse::<i64>().ok())
        .ok_or_else(|| ApiError::bad_request("query doesn't include valid uid"))
}

/// Rejects blank names
pub fn require_name(name: &str) -> Result<&str, ApiError> {
    let name = name.trim();
    if name.is_empty() {
        Err(ApiError::bad_request("name must not be empty"))
    } else {
        Ok(name)
    }
}
