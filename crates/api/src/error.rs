//! JSON error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use clubdocs_core::document::DocumentError;
use clubdocs_shared::AppError;

/// Handler error rendered as `{"error": CODE, "message": ...}`.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl ApiError {
    /// Shortcut for a 400 response.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self(AppError::Validation(msg.into()))
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<DocumentError> for ApiError {
    fn from(err: DocumentError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // Server-side failures are logged in full and reported generically.
        let message = if status.is_server_error() && status != StatusCode::BAD_GATEWAY {
            error!(error = %self.0, "Request failed");
            "An error occurred".to_string()
        } else {
            self.0.to_string()
        };

        (
            status,
            Json(json!({
                "error": self.0.error_code(),
                "message": message
            })),
        )
            .into_response()
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;
