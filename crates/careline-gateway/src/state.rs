//! Shared application state, built once at startup and cloned (cheaply,
//! via `Arc`) into every request handler.

use std::sync::Arc;

use careline_backend::BackendClient;
use careline_config::OrchestratorConfig;
use careline_session::SessionStore;
use careline_workflows::WorkflowEngine;

use crate::collaborators::{SpeechToText, TextToSpeech};

/// Everything an HTTP handler needs to process a request: the session
/// table, the dialog/workflow engine, the backend client (for health
/// reporting), and the speech collaborators (spec §6).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<OrchestratorConfig>,
    pub sessions: Arc<SessionStore>,
    pub engine: Arc<WorkflowEngine>,
    pub backend: Arc<dyn BackendClient>,
    pub stt: Arc<dyn SpeechToText>,
    pub tts: Arc<dyn TextToSpeech>,
}
