//! Layered configuration loading for the Careline voice receptionist
//! orchestrator.
//!
//! ```rust,no_run
//! use careline_config::OrchestratorConfig;
//!
//! let resolved = OrchestratorConfig::load(None).expect("load config");
//! println!("listening on {}:{}", resolved.config.http.bind_address, resolved.config.http.port);
//! ```
//!
//! # Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Environment variables** (`CARELINE_*`)
//! 2. **Config file** (explicit path, or the platform config directory)
//! 3. **Embedded defaults** (`defaults.toml`, compiled into the binary)
//!
//! This crate has no dependency on any other crate in this workspace; it
//! only depends on `serde`, `toml`, `thiserror`, `tracing`, and
//! `directories`.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(unreachable_pub)]

mod env;
mod merge;

/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::ResolvedConfig;
pub use types::*;

impl OrchestratorConfig {
    /// Load configuration with the full precedence chain.
    ///
    /// See [`loader::load`] for the algorithm.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a config file is malformed or the final
    /// configuration fails validation.
    pub fn load(config_path: Option<&std::path::Path>) -> ConfigResult<ResolvedConfig> {
        loader::load(config_path)
    }
}
