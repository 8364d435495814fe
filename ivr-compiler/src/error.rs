//! Error types for ivr-compiler

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::ingest::ParseError;
use crate::registry::RegistryError;
use crate::services::SubmitError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Upload could not be parsed (400)
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// ivr-common error
    #[error("Common error: {0}")]
    Common(#[from] ivr_common::Error),
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Parse(e) => ApiError::Parse(e),
            SubmitError::Registry(e) => ApiError::Registry(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Parse(ref err) => (StatusCode::BAD_REQUEST, "PARSE_ERROR", err.to_string()),
            ApiError::Registry(ref err) => match err {
                RegistryError::UnknownBuild(_) | RegistryError::NotFound(_) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string())
                }
                RegistryError::BuildClosed(_) => (StatusCode::CONFLICT, "CONFLICT", err.to_string()),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "REGISTRY_ERROR", err.to_string()),
            },
            ApiError::Common(ref err) => (StatusCode::INTERNAL_SERVER_ERROR, "COMMON_ERROR", err.to_string()),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
