//! HTTP error mapping (spec §6: "all responses include a `success` boolean
//! on error responses; errors use standard HTTP status").

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use careline_core::{ErrorKind, OrchestratorError};
use serde_json::json;

/// An error response crossing the HTTP boundary.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
}

impl ApiError {
    #[must_use]
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
        }
    }

    /// The discretion point of spec §7, resolved: an unknown or expired
    /// session id always surfaces as an explicit 404, never a silently
    /// minted replacement session.
    #[must_use]
    pub fn session_expired() -> Self {
        Self::new(StatusCode::NOT_FOUND, ErrorKind::SessionExpired.to_string())
    }

    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message.into())
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        let status = match err.kind {
            ErrorKind::SessionFull | ErrorKind::SessionExpired | ErrorKind::NotFound => {
                StatusCode::NOT_FOUND
            }
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden | ErrorKind::PolicyViolation => StatusCode::FORBIDDEN,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Timeout
            | ErrorKind::Network
            | ErrorKind::Server
            | ErrorKind::MalformedResponse
            | ErrorKind::ClassifierUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.kind.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "success": false, "error": self.error })),
        )
            .into_response()
    }
}
