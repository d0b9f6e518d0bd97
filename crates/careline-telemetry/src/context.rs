//! Per-request tracing context: a `RequestContext` builds a `tracing::Span`
//! that carries the session/turn/intent identifiers for the lifetime of one
//! orchestrator turn, the way the teacher's request-scoped spans carry a
//! component/operation pair.

use tracing::Span;
use uuid::Uuid;

/// Identifying fields for one unit of work, attached to every log line
/// emitted while the returned span is entered.
#[derive(Debug, Clone)]
pub struct RequestContext {
    component: String,
    operation: Option<String>,
    request_id: String,
    session_id: Option<String>,
    turn_index: Option<u32>,
    intent: Option<String>,
}

impl RequestContext {
    /// Start a context for the given component (e.g. `"careline-gateway"`).
    #[must_use]
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            operation: None,
            request_id: Uuid::new_v4().to_string(),
            session_id: None,
            turn_index: None,
            intent: None,
        }
    }

    /// Tag this context with the operation being performed.
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Tag this context with the session it belongs to.
    #[must_use]
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Tag this context with the turn index within its session.
    #[must_use]
    pub fn with_turn(mut self, turn_index: u32) -> Self {
        self.turn_index = Some(turn_index);
        self
    }

    /// Tag this context with the classified intent, once known.
    #[must_use]
    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.intent = Some(intent.into());
        self
    }

    /// The generated request id for this context.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Build the `tracing::Span` for this context. Enter it for the
    /// duration of the work it describes.
    #[must_use]
    pub fn span(&self) -> Span {
        tracing::info_span!(
            "request",
            component = %self.component,
            operation = self.operation.as_deref().unwrap_or("unspecified"),
            request_id = %self.request_id,
            session_id = self.session_id.as_deref().unwrap_or(""),
            turn_index = self.turn_index.unwrap_or(0),
            intent = self.intent.as_deref().unwrap_or(""),
        )
    }

    /// Enter the span and hold it for the lifetime of the returned guard.
    #[must_use]
    pub fn enter(&self) -> RequestGuard {
        RequestGuard {
            _span: self.span().entered(),
        }
    }
}

/// An entered [`RequestContext`] span. Dropping it exits the span.
pub struct RequestGuard {
    _span: tracing::span::EnteredSpan,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_are_unique() {
        let a = RequestContext::new("careline-gateway");
        let b = RequestContext::new("careline-gateway");
        assert_ne!(a.request_id(), b.request_id());
    }

    #[test]
    fn builders_compose() {
        let ctx = RequestContext::new("careline-dialog")
            .with_operation("classify_intent")
            .with_session("sess-1")
            .with_turn(3)
            .with_intent("BOOK_APPOINTMENT");
        assert_eq!(ctx.operation.as_deref(), Some("classify_intent"));
        assert_eq!(ctx.turn_index, Some(3));
    }
}
