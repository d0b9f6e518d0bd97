//! The `Session` record and the values it accumulates turn by turn.

use careline_core::entities::{merge_entities, shallow_merge};
use careline_core::{Entities, Turn};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SessionError, SessionResult};

/// One caller's ongoing conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub caller_id: String,
    pub channel: String,
    pub started_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub active: bool,
    pub current_workflow: Option<String>,
    pub workflow_state: Entities,
    pub entities: Entities,
    pub turns: Vec<Turn>,
    pub failed_intent_count: u32,
}

impl Session {
    pub(crate) fn new(id: String, caller_id: String, channel: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            caller_id,
            channel,
            started_at: now,
            last_activity: now,
            active: true,
            current_workflow: None,
            workflow_state: Entities::new(),
            entities: Entities::new(),
            turns: Vec::new(),
            failed_intent_count: 0,
        }
    }

    #[must_use]
    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>, timeout_seconds: u64) -> bool {
        let age = now.signed_duration_since(self.last_activity);
        age.num_seconds() >= i64::try_from(timeout_seconds).unwrap_or(i64::MAX)
    }

    /// Append a turn, enforcing the per-session turn limit and advancing
    /// `last_activity`. Turns are immutable once appended (spec §3).
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::TurnLimitReached`] if the session is already
    /// at `max_turns`.
    pub fn append_turn(&mut self, turn: Turn, max_turns: u32) -> SessionResult<()> {
        if self.turns.len() >= max_turns as usize {
            self.active = false;
            return Err(SessionError::TurnLimitReached(self.id.clone()));
        }
        self.last_activity = turn.timestamp;
        self.turns.push(turn);
        Ok(())
    }

    /// Merge an incoming entity bag into the session's merged entity bag,
    /// overwriting a key only when the incoming value is truthy (spec
    /// §4.2).
    pub fn merge_entities(&mut self, incoming: &Entities) {
        merge_entities(&mut self.entities, incoming);
    }

    /// Begin a new workflow, replacing any prior workflow state.
    pub fn set_workflow(&mut self, name: impl Into<String>, initial_state: Entities) {
        self.current_workflow = Some(name.into());
        self.workflow_state = initial_state;
    }

    /// Shallow-merge a partial bag into the active workflow's state (spec
    /// §4.7's `update_workflow_state`); always overwrites on a key
    /// collision, unlike [`Session::merge_entities`].
    pub fn update_workflow_state(&mut self, partial: &Entities) {
        shallow_merge(&mut self.workflow_state, partial);
    }

    /// End the active workflow and clear its state.
    pub fn clear_workflow(&mut self) {
        self.current_workflow = None;
        self.workflow_state = Entities::new();
    }

    /// Record that a turn resolved to `UNCLEAR` or a safety `clarify`,
    /// counting toward the auto-escalation rule (spec §4.5).
    pub fn mark_intent_failed(&mut self) {
        self.failed_intent_count = self.failed_intent_count.saturating_add(1);
    }

    /// Reset the failed-intent counter after a turn successfully advances.
    pub fn mark_intent_advanced(&mut self) {
        self.failed_intent_count = 0;
    }
}
