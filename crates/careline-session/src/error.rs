//! Session Store error types.

use thiserror::Error;

/// Errors that can occur while operating on a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session {0} was not found")]
    NotFound(String),

    #[error("session {0} has expired")]
    Expired(String),

    #[error("session {0} has reached its turn limit")]
    TurnLimitReached(String),
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
