//! API error types.

use std::sync::atomic::{AtomicBool, Ordering};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use rclip_models::RequestError;
use rclip_storage::StorageError;
use rclip_worker::WorkerError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Whether storage failure details are withheld from response bodies.
static HIDE_INTERNAL_DETAILS: AtomicBool = AtomicBool::new(false);

/// Withhold storage failure details from clients. Set from
/// [`ApiConfig::is_production`](crate::config::ApiConfig::is_production) when
/// state is built.
pub fn hide_internal_details(hide: bool) {
    HIDE_INTERNAL_DETAILS.store(hide, Ordering::Relaxed);
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Validation(#[from] RequestError),

    #[error("{0}")]
    NotFound(String),

    #[error("Failed to process video: {0}")]
    Processing(WorkerError),

    #[error("Storage error: {0}")]
    Storage(StorageError),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn session_not_found() -> Self {
        Self::NotFound("Session not found".to_string())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Processing(_) | ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message sent to the client.
    fn public_message(&self, hide_internal: bool) -> String {
        match self {
            ApiError::Storage(_) if hide_internal => "An internal error occurred".to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<WorkerError> for ApiError {
    fn from(err: WorkerError) -> Self {
        match err {
            WorkerError::Storage(e) => Self::Storage(e),
            other => Self::Processing(other),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        if err.is_not_found() {
            Self::session_not_found()
        } else {
            Self::Storage(err)
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error = self.public_message(HIDE_INTERNAL_DETAILS.load(Ordering::Relaxed));

        if status.is_server_error() {
            tracing::error!(status = %status, "Request failed: {}", self);
        }

        (status, Json(ErrorResponse { error })).into_response()
    }
}
