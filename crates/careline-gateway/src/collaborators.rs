//! Speech collaborator contracts (spec §6). The specific STT/TTS providers
//! are out of scope (spec §1); each is represented only by the minimal
//! trait a provider adapts to, mirroring how `careline_dialog`'s
//! `LlmBackend` separates a provider's transport from its contract.

use async_trait::async_trait;

/// One transcription result.
pub struct Transcription {
    pub transcript: String,
    pub confidence: f32,
    pub alternatives: Vec<String>,
}

/// Converts caller audio into text.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, audio_base64: &str, sample_rate: Option<u32>) -> Transcription;
}

/// One synthesized-audio result.
pub struct Synthesis {
    pub audio_base64: String,
    pub duration_seconds: f32,
}

/// Converts a textual reply into audio. Failures are non-fatal (spec §6):
/// the orchestrator still returns a textual reply, so this returns `None`
/// rather than an error.
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    async fn synthesize(&self, text: &str, speed: f32, pitch: f32) -> Option<Synthesis>;
}

/// Placeholder STT returned when no provider is configured (spec §6: "may
/// return a mock placeholder when unconfigured").
pub struct MockSpeechToText;

#[async_trait]
impl SpeechToText for MockSpeechToText {
    async fn transcribe(&self, _audio_base64: &str, _sample_rate: Option<u32>) -> Transcription {
        Transcription {
            transcript: String::new(),
            confidence: 0.0,
            alternatives: Vec::new(),
        }
    }
}

/// Placeholder TTS: synthesizes nothing, so callers fall back to the
/// textual reply alone.
pub struct MockTextToSpeech;

#[async_trait]
impl TextToSpeech for MockTextToSpeech {
    async fn synthesize(&self, _text: &str, _speed: f32, _pitch: f32) -> Option<Synthesis> {
        None
    }
}
