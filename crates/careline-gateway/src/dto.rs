//! Request/response bodies for the inbound HTTP surface (spec §6).

use careline_core::Entities;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CallStartRequest {
    pub caller_id: String,
    pub channel: String,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CallStartResponse {
    pub success: bool,
    pub session_id: String,
    pub response_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_base64: Option<String>,
    pub requires_input: bool,
}

#[derive(Debug, Deserialize)]
pub struct ConversationProcessRequest {
    pub session_id: String,
    pub user_input: String,
    #[serde(default)]
    pub context: Option<Entities>,
    #[serde(default)]
    pub return_audio: bool,
}

#[derive(Debug, Serialize)]
pub struct ConversationProcessResponse {
    pub success: bool,
    pub session_id: String,
    pub intent: String,
    pub entities: Entities,
    pub response_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_base64: Option<String>,
    pub context: Entities,
    pub is_complete: bool,
    pub requires_human: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TranscribeRequest {
    pub session_id: String,
    pub audio_base64: String,
    #[serde(default)]
    pub sample_rate: Option<u32>,
    #[serde(default)]
    pub encoding: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub success: bool,
    pub session_id: String,
    pub transcript: String,
    pub confidence: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternatives: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct SynthesizeRequest {
    pub text: String,
    #[serde(default = "default_speed")]
    pub speed: f32,
    #[serde(default)]
    pub pitch: f32,
}

fn default_speed() -> f32 {
    1.0
}

#[derive(Debug, Serialize)]
pub struct SynthesizeResponse {
    pub success: bool,
    pub audio_base64: String,
    pub duration_seconds: f32,
}
