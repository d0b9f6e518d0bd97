//! Environment variable overrides, applied after the embedded defaults and
//! any config file so an operator can always override without a rebuild or
//! a file edit (e.g. for container deployments).

use toml::Value;

use crate::merge::deep_merge;

/// One `CARELINE_*` variable and the dotted path it overrides, e.g.
/// `["http", "port"]`.
struct EnvBinding {
    var: &'static str,
    path: &'static [&'static str],
}

const BINDINGS: &[EnvBinding] = &[
    EnvBinding { var: "CARELINE_HTTP_BIND_ADDRESS", path: &["http", "bind_address"] },
    EnvBinding { var: "CARELINE_HTTP_PORT", path: &["http", "port"] },
    EnvBinding { var: "CARELINE_BACKEND_BASE_URL", path: &["backend", "base_url"] },
    EnvBinding { var: "CARELINE_BACKEND_USERNAME", path: &["backend", "username"] },
    EnvBinding { var: "CARELINE_BACKEND_PASSWORD", path: &["backend", "password"] },
    EnvBinding { var: "CARELINE_BACKEND_TOKEN_CACHE_HOURS", path: &["backend", "token_cache_hours"] },
    EnvBinding { var: "CARELINE_LLM_PROVIDER", path: &["llm", "provider"] },
    EnvBinding { var: "CARELINE_LLM_API_KEY", path: &["llm", "api_key"] },
    EnvBinding { var: "CARELINE_LLM_MODEL", path: &["llm", "model"] },
    EnvBinding { var: "CARELINE_LLM_BASE_URL", path: &["llm", "base_url"] },
    EnvBinding { var: "CARELINE_VOICE_LANGUAGE", path: &["voice", "language"] },
    EnvBinding { var: "CARELINE_VOICE_GENDER", path: &["voice", "gender"] },
    EnvBinding { var: "CARELINE_SESSION_TIMEOUT_SECONDS", path: &["session", "timeout_seconds"] },
    EnvBinding { var: "CARELINE_SESSION_MAX_TURNS", path: &["session", "max_turns"] },
    EnvBinding { var: "CARELINE_SESSION_SWEEP_INTERVAL_SECS", path: &["session", "sweep_interval_secs"] },
    EnvBinding { var: "CARELINE_LOG_LEVEL", path: &["logging", "level"] },
    EnvBinding { var: "CARELINE_LOG_FORMAT", path: &["logging", "format"] },
    EnvBinding { var: "CARELINE_ENCRYPTION_KEY", path: &["security", "encryption_key"] },
    EnvBinding { var: "CARELINE_JWT_SECRET_KEY", path: &["security", "jwt_secret_key"] },
];

/// Apply every `CARELINE_*` environment variable that is currently set onto
/// `merged`, returning how many overrides were applied.
pub fn apply_env_overrides(merged: &mut Value) -> usize {
    let mut applied = 0;
    for binding in BINDINGS {
        let Ok(raw) = std::env::var(binding.var) else {
            continue;
        };
        let leaf = coerce(&raw);
        set_path(merged, binding.path, leaf);
        applied += 1;
    }
    applied
}

/// Parse an env var's raw string into the most specific TOML scalar it
/// looks like (integer, float, bool, else string).
fn coerce(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Integer(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Value::Float(f);
    }
    if let Ok(b) = raw.parse::<bool>() {
        return Value::Boolean(b);
    }
    Value::String(raw.to_owned())
}

fn set_path(root: &mut Value, path: &[&str], leaf: Value) {
    let mut overlay = leaf;
    for segment in path.iter().rev() {
        let mut table = toml::map::Map::new();
        table.insert((*segment).to_owned(), overlay);
        overlay = Value::Table(table);
    }
    deep_merge(root, &overlay);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerces_scalar_kinds() {
        assert_eq!(coerce("7860"), Value::Integer(7860));
        assert_eq!(coerce("true"), Value::Boolean(true));
        assert_eq!(coerce("0.75"), Value::Float(0.75));
        assert_eq!(coerce("rule_based"), Value::String("rule_based".to_owned()));
    }

    #[test]
    fn set_path_builds_nested_tables() {
        let mut root = Value::Table(toml::map::Map::new());
        set_path(&mut root, &["http", "port"], Value::Integer(9000));
        assert_eq!(root["http"]["port"].as_integer(), Some(9000));
    }
}
