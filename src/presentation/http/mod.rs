pub mod auth;
pub mod files;
pub mod health;
pub mod posts;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::posts::error::BlogError;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

/// Boundary error for all handlers. Use-case failures arrive as `anyhow`
/// errors and are downcast to [`BlogError`] for status mapping; anything
/// else is a 500.
pub enum ApiError {
    Status(StatusCode),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl From<StatusCode> for ApiError {
    fn from(status: StatusCode) -> Self {
        ApiError::Status(status)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Status(status) => (
                status,
                status.canonical_reason().unwrap_or("error").to_string(),
            ),
            ApiError::Internal(err) => match err.downcast_ref::<BlogError>() {
                Some(e @ BlogError::SlugTaken { .. })
                | Some(e @ BlogError::SlugAllocationExhausted { .. }) => {
                    (StatusCode::CONFLICT, e.to_string())
                }
                Some(e @ BlogError::PostNotFound { .. }) => (StatusCode::NOT_FOUND, e.to_string()),
                Some(e @ BlogError::Validation(_)) | Some(e @ BlogError::LastLanguageRemoval) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
                }
                None => {
                    tracing::error!(error = ?err, "request_failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal error".to_string(),
                    )
                }
            },
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}
