//! HTTP error mapping. Every error leaves the API as a structured JSON
//! body with a stable `error` code, never a bare string.

use crate::error::ReconError;
use crate::store::TaskUpdateError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::warn;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    ServiceUnavailable(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, &str) {
        match self {
            Self::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m),
            Self::BadRequest(m) => (StatusCode::BAD_REQUEST, "bad_request", m),
            Self::Conflict(m) => (StatusCode::CONFLICT, "conflict", m),
            Self::ServiceUnavailable(m) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", m)
            }
            Self::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", m),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            warn!(status = %status, message, "Request failed");
        }
        let body = ErrorBody {
            error: code,
            message: message.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ReconError> for ApiError {
    fn from(error: ReconError) -> Self {
        match error {
            ReconError::Validation { .. } => Self::BadRequest(error.to_string()),
            ReconError::CircuitOpen { .. } => Self::ServiceUnavailable(error.to_string()),
            ReconError::ExternalService { .. } => Self::ServiceUnavailable(error.to_string()),
            ReconError::Processing { .. } | ReconError::Configuration(_) => {
                Self::Internal(error.to_string())
            }
        }
    }
}

impl From<TaskUpdateError> for ApiError {
    fn from(error: TaskUpdateError) -> Self {
        match error {
            TaskUpdateError::NotFound(_) => Self::NotFound(error.to_string()),
            TaskUpdateError::VersionConflict { .. } | TaskUpdateError::IllegalTransition { .. } => {
                Self::Conflict(error.to_string())
            }
        }
    }
}
