//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::OrchestratorConfig;

/// Validate a fully-merged configuration, returning the first violation.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] if any field is out of range or
/// internally inconsistent.
pub fn validate(config: &OrchestratorConfig) -> ConfigResult<()> {
    validate_http(config)?;
    validate_session(config)?;
    validate_retry(config)?;
    validate_circuit_breaker(config)?;
    validate_safety(config)?;
    validate_voice(config)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn validate_http(config: &OrchestratorConfig) -> ConfigResult<()> {
    if config.http.port == 0 {
        return Err(invalid("http.port", "port must be non-zero"));
    }
    if config.http.bind_address.trim().is_empty() {
        return Err(invalid("http.bind_address", "must not be empty"));
    }
    Ok(())
}

fn validate_session(config: &OrchestratorConfig) -> ConfigResult<()> {
    if config.session.timeout_seconds == 0 {
        return Err(invalid(
            "session.timeout_seconds",
            "must be greater than zero",
        ));
    }
    if config.session.max_turns == 0 {
        return Err(invalid("session.max_turns", "must be greater than zero"));
    }
    if config.session.sweep_interval_secs == 0 {
        return Err(invalid(
            "session.sweep_interval_secs",
            "must be greater than zero",
        ));
    }
    Ok(())
}

fn validate_one_retry_profile(field: &str, profile: crate::types::RetryProfile) -> ConfigResult<()> {
    if profile.base_delay_ms > profile.max_delay_ms {
        return Err(invalid(
            field,
            format!(
                "base_delay_ms ({}) must not exceed max_delay_ms ({})",
                profile.base_delay_ms, profile.max_delay_ms
            ),
        ));
    }
    Ok(())
}

fn validate_retry(config: &OrchestratorConfig) -> ConfigResult<()> {
    validate_one_retry_profile("retry.llm", config.retry.llm)?;
    validate_one_retry_profile("retry.backend_api", config.retry.backend_api)?;
    validate_one_retry_profile("retry.speech", config.retry.speech)?;
    Ok(())
}

fn validate_circuit_breaker(config: &OrchestratorConfig) -> ConfigResult<()> {
    if config.circuit_breaker.failure_threshold == 0 {
        return Err(invalid(
            "circuit_breaker.failure_threshold",
            "must be greater than zero",
        ));
    }
    Ok(())
}

fn validate_safety(config: &OrchestratorConfig) -> ConfigResult<()> {
    let s = &config.safety;
    if !(0.0..=1.0).contains(&s.high_band)
        || !(0.0..=1.0).contains(&s.medium_band)
        || !(0.0..=1.0).contains(&s.low_band)
    {
        return Err(invalid(
            "safety.*_band",
            "confidence band thresholds must be between 0.0 and 1.0",
        ));
    }
    if !(s.high_band >= s.medium_band && s.medium_band >= s.low_band) {
        return Err(invalid(
            "safety.*_band",
            "bands must satisfy high_band >= medium_band >= low_band",
        ));
    }
    for (intent, threshold) in &s.intent_thresholds {
        if !(0.0..=1.0).contains(threshold) {
            return Err(invalid(
                "safety.intent_thresholds",
                format!("threshold for {intent} ({threshold}) must be between 0.0 and 1.0"),
            ));
        }
    }
    Ok(())
}

fn validate_voice(config: &OrchestratorConfig) -> ConfigResult<()> {
    if !matches!(config.voice.gender.as_str(), "MALE" | "FEMALE" | "NEUTRAL") {
        return Err(invalid(
            "voice.gender",
            format!(
                "unsupported gender '{}'; expected MALE, FEMALE, or NEUTRAL",
                config.voice.gender
            ),
        ));
    }
    Ok(())
}
