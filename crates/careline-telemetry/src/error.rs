//! Telemetry error types.

use thiserror::Error;

/// Errors that can occur while configuring telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log configuration: {0}")]
    Config(String),

    #[error("failed to install global subscriber: {0}")]
    Init(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
