//! Handler functions for the inbound HTTP surface (spec §6).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use careline_workflows::{greeting_text, CALLER_TOKEN_KEY};
use serde_json::json;
use tracing::{info, instrument};

use crate::dto::{
    CallStartRequest, CallStartResponse, ConversationProcessRequest, ConversationProcessResponse,
    SynthesizeRequest, SynthesizeResponse, TranscribeRequest, TranscribeResponse,
};
use crate::error::ApiError;
use crate::health::{backend_check, HealthStatus};
use crate::state::AppState;

/// `POST /voice/call` — start a new session and speak the time-of-day
/// greeting (spec §6, §4.7).
#[instrument(skip(state, body), fields(caller_id = %body.caller_id, channel = %body.channel))]
pub async fn voice_call(
    State(state): State<AppState>,
    Json(body): Json<CallStartRequest>,
) -> Result<Json<CallStartResponse>, ApiError> {
    if body.caller_id.trim().is_empty() {
        return Err(ApiError::invalid_input("caller_id is required"));
    }
    if body.channel.trim().is_empty() {
        return Err(ApiError::invalid_input("channel is required"));
    }

    let session_id = state.sessions.create(&body.caller_id, &body.channel);
    let response_text = greeting_text();

    let audio_base64 = state
        .tts
        .synthesize(&response_text, 1.0, 0.0)
        .await
        .map(|synthesis| synthesis.audio_base64);

    info!(session_id = %session_id, "call started");
    Ok(Json(CallStartResponse {
        success: true,
        session_id,
        response_text,
        audio_base64,
        requires_input: true,
    }))
}

/// `POST /conversation/process` — one dialog turn (spec §6).
///
/// An unknown or expired session id resolves the §7 discretion point as a
/// `404` carrying `{success: false, error: "session_expired"}`, per
/// `SPEC_FULL.md` §6, rather than silently minting a replacement session.
#[instrument(skip(state, body), fields(session_id = %body.session_id))]
pub async fn conversation_process(
    State(state): State<AppState>,
    Json(body): Json<ConversationProcessRequest>,
) -> Result<Json<ConversationProcessResponse>, ApiError> {
    if body.user_input.trim().is_empty() {
        return Err(ApiError::invalid_input("user_input is required"));
    }

    let handle = state
        .sessions
        .handle(&body.session_id)
        .await
        .ok_or_else(ApiError::session_expired)?;
    let mut session = handle.lock().await;

    if let Some(client_context) = &body.context {
        session.merge_entities(client_context);
    }

    let turn = state
        .engine
        .process_turn(&mut session, &body.user_input)
        .await?;

    let next_prompt = (!turn.is_complete && !turn.requires_human).then(|| turn.response_text.clone());
    let turn_entities = session
        .turns
        .last()
        .map(|t| t.entities.clone())
        .unwrap_or_default();

    let audio_base64 = if body.return_audio {
        state
            .tts
            .synthesize(&turn.response_text, 1.0, 0.0)
            .await
            .map(|synthesis| synthesis.audio_base64)
    } else {
        None
    };

    Ok(Json(ConversationProcessResponse {
        success: true,
        session_id: body.session_id,
        intent: turn.intent,
        entities: turn_entities,
        response_text: turn.response_text,
        audio_base64,
        context: turn.context,
        is_complete: turn.is_complete,
        requires_human: turn.requires_human,
        next_prompt,
    }))
}

/// `POST /voice/transcribe` — thin wrapper over the STT collaborator (spec
/// §6). `session_id` is accepted but not required to resolve to a live
/// session: transcription happens before any dialog turn is attempted.
#[instrument(skip(state, body), fields(session_id = %body.session_id))]
pub async fn voice_transcribe(
    State(state): State<AppState>,
    Json(body): Json<TranscribeRequest>,
) -> Result<Json<TranscribeResponse>, ApiError> {
    if body.audio_base64.trim().is_empty() {
        return Err(ApiError::invalid_input("audio_base64 is required"));
    }

    let transcription = state.stt.transcribe(&body.audio_base64, body.sample_rate).await;
    let alternatives = (!transcription.alternatives.is_empty()).then_some(transcription.alternatives);

    Ok(Json(TranscribeResponse {
        success: true,
        session_id: body.session_id,
        transcript: transcription.transcript,
        confidence: transcription.confidence,
        alternatives,
    }))
}

/// `POST /voice/synthesize` (spec §6).
#[instrument(skip(state, body))]
pub async fn voice_synthesize(
    State(state): State<AppState>,
    Json(body): Json<SynthesizeRequest>,
) -> Result<Json<SynthesizeResponse>, ApiError> {
    if body.text.trim().is_empty() {
        return Err(ApiError::invalid_input("text is required"));
    }
    if !(0.5..=2.0).contains(&body.speed) {
        return Err(ApiError::invalid_input("speed must be between 0.5 and 2.0"));
    }
    if !(-10.0..=10.0).contains(&body.pitch) {
        return Err(ApiError::invalid_input("pitch must be between -10 and 10"));
    }

    match state.tts.synthesize(&body.text, body.speed, body.pitch).await {
        Some(synthesis) => Ok(Json(SynthesizeResponse {
            success: true,
            audio_base64: synthesis.audio_base64,
            duration_seconds: synthesis.duration_seconds,
        })),
        None => Ok(Json(SynthesizeResponse {
            success: true,
            audio_base64: String::new(),
            duration_seconds: 0.0,
        })),
    }
}

/// `GET /session/{id}` — session inspection (spec §6). Returns the full
/// session record, since nothing in it is more sensitive than what already
/// crossed the HTTP boundary turn by turn.
#[instrument(skip(state))]
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let handle = state.sessions.handle(&id).await.ok_or_else(ApiError::session_expired)?;
    let mut session = handle.lock().await.clone();
    // The caller's portal bearer token never leaves the process (spec §4.1,
    // §4.7): strip it from the inspection response even though it lives in
    // the same entity bag as ordinary passthrough fields.
    session.entities.remove(CALLER_TOKEN_KEY);
    Ok(Json(json!({ "success": true, "session": session })))
}

/// `DELETE /session/{id}` — explicit session termination (spec §6, §4.2).
#[instrument(skip(state))]
pub async fn delete_session(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    state.sessions.end(&id);
    Json(json!({ "success": true }))
}

/// `GET /health` — liveness, backend connectivity, and active session
/// count (spec §6).
#[instrument(skip(state))]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let circuit_state = state.backend.circuit_state().await;
    let checks = vec![backend_check(circuit_state).await];
    let status = HealthStatus::from_checks(checks, state.sessions.active_count());
    let code = match status.state {
        crate::health::HealthState::Healthy | crate::health::HealthState::Degraded => StatusCode::OK,
        crate::health::HealthState::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, Json(status))
}

pub async fn not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "route not found")
}
