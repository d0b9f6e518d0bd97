//! Logging and tracing setup for the Careline voice receptionist
//! orchestrator.
//!
//! ```no_run
//! use careline_telemetry::{LogConfig, LogFormat, setup_logging, RequestContext};
//!
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Pretty)
//!     .with_directive("careline_backend=debug");
//! setup_logging(&config).expect("install subscriber");
//!
//! let ctx = RequestContext::new("careline-dialog").with_operation("classify_intent");
//! let _guard = ctx.enter();
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![allow(clippy::missing_errors_doc)]

pub mod context;
pub mod error;
pub mod logging;
pub mod prelude;

pub use context::{RequestContext, RequestGuard};
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, setup_default_logging, setup_logging};
