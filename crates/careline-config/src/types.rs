//! Configuration struct definitions.
//!
//! Every field here has a corresponding entry in `defaults.toml`, so a
//! config file or environment override only needs to specify what it wants
//! to change.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The fully resolved, immutable configuration for one orchestrator process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
    #[serde(default)]
    pub safety: SafetyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

/// Inbound HTTP surface (§6 endpoints).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind_address: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_owned(),
            port: 7860,
        }
    }
}

/// Hospital backend base URL and service-account credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub token_cache_hours: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5001/api/v1".to_owned(),
            username: "voice_agent".to_owned(),
            password: String::new(),
            token_cache_hours: 23,
        }
    }
}

/// LLM provider selector and credentials for the Intent Classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "rule_based".to_owned(),
            api_key: None,
            model: None,
            base_url: None,
        }
    }
}

/// Voice language and gender selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub language: String,
    pub gender: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            language: "en-IN".to_owned(),
            gender: "FEMALE".to_owned(),
        }
    }
}

/// Session lifecycle tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub timeout_seconds: u64,
    pub max_turns: u32,
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 300,
            max_turns: 20,
            sweep_interval_secs: 30,
        }
    }
}

/// One destination's retry profile: max attempts and full-jitter backoff
/// bounds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryProfile {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryProfile {
    const fn new(max_attempts: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            base_delay_ms,
            max_delay_ms,
        }
    }
}

impl Default for RetryProfile {
    fn default() -> Self {
        Self::new(2, 500, 5_000)
    }
}

/// Per-destination retry profiles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub llm: RetryProfile,
    pub backend_api: RetryProfile,
    pub speech: RetryProfile,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            llm: RetryProfile::new(3, 1_000, 10_000),
            backend_api: RetryProfile::new(2, 500, 5_000),
            speech: RetryProfile::new(2, 500, 3_000),
        }
    }
}

/// Circuit breaker thresholds, shared by every logical destination (the
/// backend, the LLM provider); each destination holds its own instance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub recovery_timeout_secs: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout_secs: 60,
        }
    }
}

/// Safety Guardrails confidence bands and per-intent threshold overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    pub high_band: f32,
    pub medium_band: f32,
    pub low_band: f32,
    pub intent_thresholds: BTreeMap<String, f32>,
    pub default_threshold: f32,
    pub auto_escalate_turn_count: u32,
    pub auto_escalate_failed_intents: u32,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        let mut intent_thresholds = BTreeMap::new();
        intent_thresholds.insert("REGISTER_PATIENT".to_owned(), 0.80);
        intent_thresholds.insert("BOOK_APPOINTMENT".to_owned(), 0.75);
        intent_thresholds.insert("REPORT_EMERGENCY".to_owned(), 0.50);
        intent_thresholds.insert("REQUEST_BED_ALLOCATION".to_owned(), 0.80);
        intent_thresholds.insert("CANCEL_APPOINTMENT".to_owned(), 0.85);

        Self {
            high_band: 0.85,
            medium_band: 0.65,
            low_band: 0.40,
            intent_thresholds,
            default_threshold: 0.65,
            auto_escalate_turn_count: 15,
            auto_escalate_failed_intents: 3,
        }
    }
}

/// Process-wide logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "json".to_owned(),
        }
    }
}

/// Secrets used for at-rest protection of stored conversation transcripts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub encryption_key: Option<String>,
    pub jwt_secret_key: Option<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            encryption_key: None,
            jwt_secret_key: None,
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            backend: BackendConfig::default(),
            llm: LlmConfig::default(),
            voice: VoiceConfig::default(),
            session: SessionConfig::default(),
            retry: RetryConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            safety: SafetyConfig::default(),
            logging: LoggingConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}
