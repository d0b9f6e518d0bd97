//! Entrypoint for the Careline voice receptionist orchestrator's HTTP
//! surface (spec §6): wires the layered config loader, the Backend Client,
//! the Session Store, the Workflow Engine, and the speech collaborators
//! into one `axum` server with a background expiry-sweep task and graceful
//! shutdown.

mod collaborators;
mod dto;
mod error;
mod handlers;
mod health;
mod routes;
mod state;
#[cfg(test)]
mod tests;

use std::path::PathBuf;
use std::sync::Arc;

use careline_backend::{BackendClient, HttpBackendClient};
use careline_config::OrchestratorConfig;
use careline_dialog::{IntentClassifier, RuleBasedClassifier};
use careline_session::{spawn_sweep_task, SessionStore};
use careline_telemetry::{setup_logging, LogConfig, LogFormat};
use careline_workflows::WorkflowEngine;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::collaborators::{MockSpeechToText, MockTextToSpeech};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::var("CARELINE_CONFIG_FILE").ok().map(PathBuf::from);
    let resolved = OrchestratorConfig::load(config_path.as_deref())?;
    let config: OrchestratorConfig = resolved.config;

    let log_format = match config.logging.format.as_str() {
        "pretty" => LogFormat::Pretty,
        _ => LogFormat::Json,
    };
    setup_logging(&LogConfig::new(&config.logging.level).with_format(log_format))?;

    if let Some(path) = &resolved.loaded_from {
        info!(path = %path.display(), "loaded config file");
    } else {
        info!("running with embedded defaults and environment overrides only");
    }

    if config.llm.provider != "rule_based" {
        warn!(
            provider = %config.llm.provider,
            "no LLM provider adapter is compiled in (spec §1: providers are out of scope); \
             falling back to the rule-based classifier"
        );
    }

    let backend: Arc<dyn BackendClient> = Arc::new(HttpBackendClient::new(
        &config.backend,
        &config.retry,
        config.circuit_breaker,
    ));
    let classifier: Arc<dyn IntentClassifier> = Arc::new(RuleBasedClassifier::new());
    let sessions = Arc::new(SessionStore::new(config.session.timeout_seconds, config.session.max_turns));
    let engine = Arc::new(WorkflowEngine::new(classifier, Arc::clone(&backend), &config));

    let state = AppState {
        config: Arc::new(config.clone()),
        sessions: Arc::clone(&sessions),
        engine,
        backend,
        stt: Arc::new(MockSpeechToText),
        tts: Arc::new(MockTextToSpeech),
    };

    let sweep_handle = spawn_sweep_task(sessions, config.session.sweep_interval_secs);

    let app = routes::build(state);
    let bind = format!("{}:{}", config.http.bind_address, config.http.port);
    let listener = TcpListener::bind(&bind).await?;
    info!(address = %bind, "careline-gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweep_handle.abort();
    info!("careline-gateway shut down");
    Ok(())
}

/// Waits for Ctrl+C or SIGTERM, whichever comes first, matching the
/// teacher's own gateway shutdown signal handling.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    info!("shutdown signal received");
}
