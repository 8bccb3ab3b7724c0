//! Classified error taxonomy for the REST boundary.
//!
//! Every failure a handler can produce is resolved into one of these
//! variants before it crosses the HTTP boundary. `Internal` is the only
//! variant that carries unclassified detail, and that detail goes to the
//! log, never to the caller.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use tracing::error;

/// Why authentication failed. The three variants all map to 401 but are
/// kept distinct so callers of the verifier (and the logs) can tell them
/// apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// No Authorization header, or not of the form `Bearer <token>`.
    NoCredential,
    /// Bad signature, malformed token, or expired.
    InvalidCredential,
    /// Token verified but the embedded user no longer exists.
    PrincipalMissing,
}

impl AuthFailure {
    pub fn message(&self) -> &'static str {
        match self {
            AuthFailure::NoCredential => "No token provided, authorization denied",
            AuthFailure::InvalidCredential => "Invalid token, authorization denied",
            AuthFailure::PrincipalMissing => "User not found, authorization denied",
        }
    }
}

/// A single violated field constraint. Validation reports every violation,
/// not just the first.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{}", .0.message())]
    Unauthenticated(AuthFailure),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("validation failed")]
    ValidationFailed(Vec<Violation>),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    InvalidQuery(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Internal(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Unauthenticated(reason) => (
                StatusCode::UNAUTHORIZED,
                json!({ "success": false, "message": reason.message() }),
            ),
            ApiError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                json!({ "success": false, "message": format!("{what} not found") }),
            ),
            ApiError::ValidationFailed(violations) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "success": false,
                    "message": "Validation failed",
                    "errors": violations,
                }),
            ),
            ApiError::InvalidInput(msg) | ApiError::InvalidQuery(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "message": msg }),
            ),
            ApiError::Internal(e) => {
                // Full detail to the log; generic message to the caller.
                error!(error = ?e, "internal error while handling request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "success": false, "message": "Internal server error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
