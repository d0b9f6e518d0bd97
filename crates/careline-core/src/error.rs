//! Closed error vocabulary shared across the orchestrator (spec §7).

use thiserror::Error;

/// Closed error taxonomy. Every outbound call and every workflow failure is
/// translated into one of these before it crosses a crate boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Caller-supplied input failed validation.
    InvalidInput,
    /// The backend rejected our credentials.
    Unauthorized,
    /// The RBAC allow-list rejected this call before it was sent.
    Forbidden,
    /// The backend reports no such resource.
    NotFound,
    /// The backend reports a conflicting state (e.g. double-booking).
    Conflict,
    /// The outbound call did not complete within its deadline.
    Timeout,
    /// A transport-level failure (DNS, connect, reset).
    Network,
    /// The backend returned a 5xx.
    Server,
    /// The backend's response body could not be parsed as expected.
    MalformedResponse,
    /// An RBAC allow-list violation was attempted; this is always a bug.
    PolicyViolation,
    /// The intent classifier is unavailable and we fell back to rules.
    ClassifierUnavailable,
    /// The referenced session has expired or never existed.
    SessionExpired,
    /// The session has reached `max_turns`.
    SessionFull,
}

impl ErrorKind {
    /// Whether the retry handler (§4.6) is permitted to retry this kind.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::Timeout)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::InvalidInput => "invalid_input",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Timeout => "timeout",
            Self::Network => "network",
            Self::Server => "server",
            Self::MalformedResponse => "malformed_response",
            Self::PolicyViolation => "policy_violation",
            Self::ClassifierUnavailable => "classifier_unavailable",
            Self::SessionExpired => "session_expired",
            Self::SessionFull => "session_full",
        };
        f.write_str(s)
    }
}

/// Orchestrator-wide error type.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct OrchestratorError {
    /// The closed error kind (§7).
    pub kind: ErrorKind,
    /// Human-readable detail, never containing raw sensitive caller data.
    pub message: String,
}

impl OrchestratorError {
    /// Build an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Convenience alias used throughout the orchestrator.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_kinds_are_network_and_timeout_only() {
        assert!(ErrorKind::Network.is_retryable());
        assert!(ErrorKind::Timeout.is_retryable());
        assert!(!ErrorKind::Forbidden.is_retryable());
        assert!(!ErrorKind::NotFound.is_retryable());
    }

    #[test]
    fn display_matches_spec_vocabulary() {
        assert_eq!(ErrorKind::PolicyViolation.to_string(), "policy_violation");
        assert_eq!(ErrorKind::SessionFull.to_string(), "session_full");
    }

    #[test]
    fn error_renders_kind_and_message() {
        let err = OrchestratorError::new(ErrorKind::NotFound, "patient not found");
        assert_eq!(err.to_string(), "not_found: patient not found");
    }
}
