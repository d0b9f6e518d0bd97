//! Backend client error types.

use careline_core::ErrorKind;
use thiserror::Error;

/// Errors that can occur while calling the hospital backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("network error calling {endpoint}: {source}")]
    Network {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: String },

    #[error("not authenticated calling {endpoint}")]
    Unauthorized { endpoint: String },

    #[error("{method} {endpoint} is not permitted by the access policy")]
    Forbidden { method: String, endpoint: String },

    #[error("{endpoint} returned not found")]
    NotFound { endpoint: String },

    #[error("{endpoint} returned a conflict: {message}")]
    Conflict { endpoint: String, message: String },

    #[error("{endpoint} returned server error {status}: {message}")]
    Server {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("could not parse response from {endpoint}: {message}")]
    MalformedResponse { endpoint: String, message: String },

    #[error("the circuit for {destination} is open; refusing to call {endpoint}")]
    CircuitOpen {
        destination: String,
        endpoint: String,
    },
}

impl BackendError {
    /// The [`ErrorKind`] this error should be reported as to callers.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } => ErrorKind::Network,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Server { .. } => ErrorKind::Server,
            Self::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            Self::CircuitOpen { .. } => ErrorKind::Network,
        }
    }

    /// Whether the Retry Handler should treat this error as retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Timeout { .. })
    }
}

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;
