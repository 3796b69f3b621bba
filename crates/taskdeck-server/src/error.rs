use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use taskdeck_core::ServiceError;
use taskdeck_shared::{ERROR_TASK_NOT_FOUND, ErrorBody};
use tracing::error;

/// Every failure a handler can return. All of them render as
/// `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound,
    Internal(anyhow::Error),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidDescription => ApiError::BadRequest(err.to_string()),
            ServiceError::Storage(source) => ApiError::Internal(source),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound => (StatusCode::NOT_FOUND, ERROR_TASK_NOT_FOUND.to_string()),
            ApiError::Internal(err) => {
                error!(error = %format!("{err:#}"), "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to persist tasks".to_string(),
                )
            }
        };

        (status, Json(ErrorBody::new(message))).into_response()
    }
}
