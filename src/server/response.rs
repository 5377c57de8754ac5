use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::error::Result as StoreResult;

/// Standard API response wrapper: `success` is always present, the other
/// fields only when set. List endpoints carry `count`, mutations `message`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    #[must_use]
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            count: None,
            message: None,
            data: Some(data),
        }
    }

    #[must_use]
    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            count: None,
            message: Some(message.into()),
            data: Some(data),
        }
    }

    #[must_use]
    pub fn list(items: Vec<T>) -> ApiResponse<Vec<T>> {
        ApiResponse {
            success: true,
            count: Some(items.len()),
            message: None,
            data: Some(items),
        }
    }

    #[must_use]
    pub fn message(message: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            success: true,
            count: None,
            message: Some(message.into()),
            data: None,
        }
    }
}

/// API error that converts to a proper HTTP response: a stable `error`
/// label plus a human-readable `message`, under a `success: false` envelope.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub message: String,
}

impl ApiError {
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: "Validation failed".to_string(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_found(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            error: error.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn conflict(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            error: error.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn insufficient_stock(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: "Insufficient stock".to_string(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal(error: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: error.into(),
            message: "Something went wrong".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "success": false,
            "error": self.error,
            "message": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

/// Extension trait for converting store results to API errors with a custom
/// label for the unexpected-failure case. Storage detail is logged, never
/// echoed to the client.
pub trait StoreResultExt<T> {
    fn api_err(self, error: &'static str) -> Result<T, ApiError>;
}

impl<T> StoreResultExt<T> for StoreResult<T> {
    fn api_err(self, error: &'static str) -> Result<T, ApiError> {
        self.map_err(|e| {
            tracing::error!("{error}: {e}");
            ApiError::internal(error)
        })
    }
}

/// Extension for Option types from store operations.
pub trait StoreOptionExt<T> {
    fn or_not_found(self, error: &'static str, message: String) -> Result<T, ApiError>;
}

impl<T> StoreOptionExt<T> for Option<T> {
    fn or_not_found(self, error: &'static str, message: String) -> Result<T, ApiError> {
        self.ok_or_else(|| ApiError::not_found(error, message))
    }
}
