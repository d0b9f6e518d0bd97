//! Convenience re-exports for crates that just want to log and tag spans.

pub use crate::context::{RequestContext, RequestGuard};
pub use crate::error::{TelemetryError, TelemetryResult};
pub use crate::logging::{LogConfig, LogFormat, setup_default_logging, setup_logging};
pub use tracing::{debug, error, info, trace, warn};
