//! Config file discovery and layered loading.
//!
//! Implements the layered-loading algorithm:
//! 1. Parse the embedded defaults → base tree.
//! 2. Merge an optional config file (explicit path, or the platform's
//!    standard config directory for `careline`).
//! 3. Apply `CARELINE_*` environment variable overrides.
//! 4. Deserialize the merged tree → [`OrchestratorConfig`].
//! 5. Validate.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::apply_env_overrides;
use crate::error::{ConfigError, ConfigResult};
use crate::merge::deep_merge;
use crate::types::OrchestratorConfig;
use crate::validate;

/// Embedded baseline configuration, compiled into the binary.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// The result of a layered load: the resolved configuration plus which file
/// (if any) supplied the file layer, useful for startup logging.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: OrchestratorConfig,
    pub loaded_from: Option<PathBuf>,
}

/// Load configuration with the full precedence chain: embedded defaults →
/// optional file → environment variable overrides.
///
/// If `config_path` is `Some`, that file is used as the file layer (an
/// error if it is missing). If `None`, the platform's standard config
/// directory for `careline` is probed and silently skipped if absent.
///
/// # Errors
///
/// Returns a [`ConfigError`] if a config file is malformed or the final
/// merged configuration fails validation.
pub fn load(config_path: Option<&Path>) -> ConfigResult<ResolvedConfig> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::Parse {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    let loaded_from = match config_path {
        Some(explicit) => {
            let overlay = parse_file(explicit)?;
            deep_merge(&mut merged, &overlay);
            info!(path = %explicit.display(), "loaded config file");
            Some(explicit.to_path_buf())
        }
        None => match discover_default_path() {
            Some(discovered) if discovered.is_file() => {
                let overlay = parse_file(&discovered)?;
                deep_merge(&mut merged, &overlay);
                info!(path = %discovered.display(), "loaded config file");
                Some(discovered)
            }
            _ => {
                debug!("no config file found; using embedded defaults and environment overrides");
                None
            }
        },
    };

    let env_count = apply_env_overrides(&mut merged);
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable overrides");
    }

    let config: OrchestratorConfig =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        loaded_from,
    })
}

/// Load configuration using only embedded defaults and environment
/// overrides, skipping file discovery entirely.
///
/// # Errors
///
/// See [`load`].
pub fn load_without_file() -> ConfigResult<ResolvedConfig> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::Parse {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;
    apply_env_overrides(&mut merged);
    let config: OrchestratorConfig =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse {
                path: "<merged config>".to_owned(),
                source: e,
            })?;
    validate::validate(&config)?;
    Ok(ResolvedConfig {
        config,
        loaded_from: None,
    })
}

fn parse_file(path: &Path) -> ConfigResult<toml::Value> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        source: e,
    })?;
    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        source: e,
    })
}

fn discover_default_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "careline")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_alone_validate() {
        let resolved = load_without_file().unwrap();
        assert_eq!(resolved.config.http.port, 7860);
        assert_eq!(resolved.config.backend.username, "voice_agent");
    }

    #[test]
    fn explicit_file_overlays_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[http]\nport = 9100\n").unwrap();
        let resolved = load(Some(file.path())).unwrap();
        assert_eq!(resolved.config.http.port, 9100);
        assert_eq!(resolved.config.http.bind_address, "0.0.0.0");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let result = load(Some(Path::new("/nonexistent/careline/config.toml")));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
