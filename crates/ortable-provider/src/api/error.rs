//! API error types and response handling.
//!
//! Every handler returns [`ApiResult`]; errors render as a JSON
//! [`ErrorResponse`] with a matching status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use ortable_core::{OperationError, OrTableError};

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type.
#[derive(Debug, Clone)]
pub enum ApiError {
    /// 400 Bad Request - Invalid input from client.
    BadRequest {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
        /// Optional additional details.
        details: Option<serde_json::Value>,
    },

    /// 404 Not Found - Resource or operation does not exist.
    NotFound {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
        /// Optional additional details.
        details: Option<serde_json::Value>,
    },

    /// 409 Conflict - The transaction state machine refused a move.
    Conflict {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },
}

/// Standard JSON error response body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "unsupported_operation",
    "message": "Unsupported operation: activate on 'height.wiggle'",
    "details": { "handle": "height.wiggle", "kind": "activate" }
}))]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g., "invalid_value").
    #[schema(example = "invalid_value")]
    pub error: String,

    /// Human-readable error message.
    #[schema(example = "Invalid value for 'position.select': unknown predefined position 'Sofa'")]
    pub message: String,

    /// Optional additional details for debugging.
    #[schema(nullable)]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match self {
            Self::BadRequest {
                error_code,
                message,
                details,
            } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: error_code,
                    message,
                    details,
                },
            ),

            Self::NotFound {
                error_code,
                message,
                details,
            } => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: error_code,
                    message,
                    details,
                },
            ),

            Self::Conflict {
                error_code,
                message,
            } => (
                StatusCode::CONFLICT,
                ErrorResponse {
                    error: error_code,
                    message,
                    details: None,
                },
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest { message, .. } => write!(f, "Bad Request: {message}"),
            Self::NotFound { message, .. } => write!(f, "Not Found: {message}"),
            Self::Conflict { message, .. } => write!(f, "Conflict: {message}"),
        }
    }
}

impl std::error::Error for ApiError {}

/// Convert from ortable_core errors.
impl From<OrTableError> for ApiError {
    fn from(err: OrTableError) -> Self {
        let error_code = err.error_code().to_string();
        let message = err.to_string();

        match err {
            OrTableError::UnsupportedOperation { handle, kind } => Self::NotFound {
                error_code,
                message,
                details: Some(serde_json::json!({ "handle": handle, "kind": kind })),
            },
            OrTableError::InvalidValue { handle, reason } => Self::BadRequest {
                error_code,
                message,
                details: Some(serde_json::json!({ "handle": handle, "reason": reason })),
            },
            OrTableError::Transaction(_) => Self::Conflict {
                error_code,
                message,
            },
        }
    }
}

impl From<OperationError> for ApiError {
    fn from(err: OperationError) -> Self {
        Self::from(OrTableError::from(err))
    }
}
