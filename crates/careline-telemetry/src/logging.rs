//! Logging configuration and global subscriber setup.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::{TelemetryError, TelemetryResult};

/// Output rendering for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, for interactive use.
    Pretty,
    /// One JSON object per line, for production ingestion.
    Json,
}

/// Logging configuration, built with the teacher's `with_*` builder idiom.
#[derive(Debug, Clone)]
pub struct LogConfig {
    level: String,
    format: LogFormat,
    directives: Vec<String>,
}

impl LogConfig {
    /// Start a config at the given base level (e.g. `"info"`, `"debug"`).
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            format: LogFormat::Json,
            directives: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Add an extra `EnvFilter` directive, e.g. `"careline_backend=debug"`.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    fn env_filter(&self) -> TelemetryResult<EnvFilter> {
        let mut filter = EnvFilter::try_new(&self.level)
            .map_err(|e| TelemetryError::Config(e.to_string()))?;
        for directive in &self.directives {
            filter = filter.add_directive(
                directive
                    .parse()
                    .map_err(|e: tracing_subscriber::filter::ParseError| {
                        TelemetryError::Config(e.to_string())
                    })?,
            );
        }
        Ok(filter)
    }
}

/// Install the global `tracing` subscriber for this process.
///
/// # Errors
///
/// Returns [`TelemetryError`] if the filter directives are malformed or a
/// global subscriber is already installed.
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<()> {
    let filter = config.env_filter()?;
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty())
            .try_init()
            .map_err(|e| TelemetryError::Init(e.to_string())),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true))
            .try_init()
            .map_err(|e| TelemetryError::Init(e.to_string())),
    }
}

/// Install logging with sensible defaults (`info`, JSON) for production use.
///
/// # Errors
///
/// See [`setup_logging`].
pub fn setup_default_logging() -> TelemetryResult<()> {
    setup_logging(&LogConfig::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates_directives() {
        let config = LogConfig::new("info")
            .with_format(LogFormat::Pretty)
            .with_directive("careline_dialog=trace");
        assert_eq!(config.directives.len(), 1);
        assert_eq!(config.format, LogFormat::Pretty);
    }

    #[test]
    fn malformed_base_level_is_rejected() {
        let config = LogConfig::new("not-a-level-@@@");
        assert!(config.env_filter().is_err());
    }
}
