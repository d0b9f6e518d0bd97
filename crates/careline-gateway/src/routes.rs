//! Router assembly for the inbound HTTP surface (spec §6).

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the full `axum` router, CORS-permissive and trace-instrumented to
/// match `original_source/voice-agent/app/main.py`'s `CORSMiddleware`
/// policy and the teacher's own request-tracing layer.
#[must_use]
pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/voice/call", post(handlers::voice_call))
        .route("/conversation/process", post(handlers::conversation_process))
        .route("/voice/transcribe", post(handlers::voice_transcribe))
        .route("/voice/synthesize", post(handlers::voice_synthesize))
        .route(
            "/session/:id",
            get(handlers::get_session).delete(handlers::delete_session),
        )
        .route("/health", get(handlers::health))
        .fallback(handlers::not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
