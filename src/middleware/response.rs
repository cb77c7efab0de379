use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

use crate::error::ApiError;

#[derive(Serialize)]
struct Envelope<T> {
    success: bool,
    data: T,
}

/// Successful handler result, sent as `{"success": true, "data": ...}`
#[derive(Debug)]
pub struct ApiResponse<T> {
    data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self { data: Some(data) }
    }
}

impl ApiResponse<()> {
    /// 204 without a body
    pub fn no_content() -> Self {
        Self { data: None }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        match self.data {
            Some(data) => Json(Envelope {
                success: true,
                data,
            })
            .into_response(),
            None => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;
