use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use crate::backend::BackendError;
use crate::models::ErrorEnvelope;

/// Custom error type for the proxy routes
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    PayloadTooLarge(String),
    /// The backend answered with a non-success status
    Backend { status: StatusCode, message: String },
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            AppError::Backend { status, message } => {
                warn!("Backend responded with {}: {}", status, message);
                (status, message)
            }
            AppError::InternalServerError(msg) => {
                error!("Internal server error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(ErrorEnvelope { error: message })).into_response()
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Status { status, message } => AppError::Backend { status, message },
            other => AppError::InternalServerError(other.to_string()),
        }
    }
}

/// Result type for application handlers
pub type AppResult<T> = Result<T, AppError>;
