//! API error types and responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use crate::error::CaError;

/// API error type
#[derive(Error, Debug)]
pub enum ApiError {
    /// 400
    #[error("{0}")]
    BadRequest(String),

    /// 401
    #[error("{0}")]
    Unauthorized(String),

    /// 403
    #[error("{0}")]
    Forbidden(String),

    /// 404
    #[error("{0}")]
    NotFound(String),

    /// 500, capability absent
    #[error("{0}")]
    NotConfigured(String),

    /// 500, anything else; the detail is logged, not returned
    #[error("{0}")]
    Internal(String),
}

/// API error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable message
    pub error: String,
    /// Stable machine-readable code
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::NotConfigured(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "NOT_CONFIGURED", msg)
            }
            ApiError::Internal(msg) => {
                error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "the request could not be completed".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<CaError> for ApiError {
    fn from(err: CaError) -> Self {
        match err {
            CaError::Validation(msg) => ApiError::BadRequest(msg),
            CaError::Codec(msg) => ApiError::BadRequest(msg),
            err @ CaError::Authorization(_) => ApiError::Unauthorized(err.to_string()),
            CaError::Policy(msg) => ApiError::Forbidden(msg),
            err @ CaError::Signing(_) => ApiError::Forbidden(err.to_string()),
            CaError::NotFound(msg) => ApiError::NotFound(msg),
            err @ CaError::NotConfigured(_) => ApiError::NotConfigured(err.to_string()),
            err @ (CaError::Database(_) | CaError::Internal(_)) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}
