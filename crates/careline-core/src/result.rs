//! Result types passed between the Dialog Kernel and the Workflow Engine
//! (spec §3).

use serde::{Deserialize, Serialize};

use crate::entities::Entities;
use crate::error::ErrorKind;
use crate::turn::BackendCallRecord;

/// Outcome of intent classification for one turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentResult {
    pub intent: String,
    pub confidence: f32,
    pub entities: Entities,
    pub required_missing_fields: Vec<String>,
}

impl IntentResult {
    /// The classifier's designated "I don't understand" result (spec §4.3).
    #[must_use]
    pub fn unclear() -> Self {
        Self {
            intent: crate::intent::Intent::Unclear.as_str().to_owned(),
            confidence: 0.3,
            entities: Entities::new(),
            required_missing_fields: Vec::new(),
        }
    }
}

/// Outcome of a workflow's `execute`/`continue_workflow` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub success: bool,
    pub response_text: String,
    #[serde(default)]
    pub updated_context: Entities,
    #[serde(default)]
    pub is_complete: bool,
    #[serde(default)]
    pub requires_human: bool,
    #[serde(default)]
    pub calls: Vec<BackendCallRecord>,
    pub error: Option<(ErrorKind, String)>,
}

impl WorkflowResult {
    /// Build a simple, successful, incomplete reply with no context update.
    #[must_use]
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            success: true,
            response_text: text.into(),
            updated_context: Entities::new(),
            is_complete: false,
            requires_human: false,
            calls: Vec::new(),
            error: None,
        }
    }

    /// Attach an updated-context bag (builder-style, matching the teacher's
    /// `with_*` convention for result/config types).
    #[must_use]
    pub fn with_context(mut self, context: Entities) -> Self {
        self.updated_context = context;
        self
    }

    /// Mark the workflow as finished.
    #[must_use]
    pub fn complete(mut self) -> Self {
        self.is_complete = true;
        self
    }

    /// Mark the turn as requiring a human handoff.
    #[must_use]
    pub fn requires_human(mut self) -> Self {
        self.requires_human = true;
        self
    }
}

/// Outcome of validating and normalizing a single entity (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ValidationOutcome {
    Valid { normalized: String },
    Invalid { error: String },
    NeedsConfirmation { normalized: String },
}

impl ValidationOutcome {
    /// The normalized value, if this outcome carries one.
    #[must_use]
    pub fn normalized(&self) -> Option<&str> {
        match self {
            Self::Valid { normalized } | Self::NeedsConfirmation { normalized } => {
                Some(normalized)
            }
            Self::Invalid { .. } => None,
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }
}
