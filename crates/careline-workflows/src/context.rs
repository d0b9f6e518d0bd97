//! The per-turn context every workflow reads from (spec §4.7's three-tier
//! lookup: turn entities, then the collected-entities cache, then the
//! workflow's own private state bag).

use careline_core::entities::{is_truthy, lookup_str};
use careline_core::Entities;
use serde_json::Value;

/// Everything a workflow needs about the caller's session for one turn,
/// besides the turn's freshly extracted entities (which each `Workflow`
/// method receives as a separate argument so callers can't forget to pass
/// them).
#[derive(Debug, Clone, Copy)]
pub struct WorkflowContext<'a> {
    pub channel: &'a str,
    pub patient_token: Option<&'a str>,
    pub collected: &'a Entities,
    pub workflow_state: &'a Entities,
    pub turn_count: u32,
}

impl<'a> WorkflowContext<'a> {
    /// Three-tier string lookup: `turn` first, then the collected-entities
    /// cache, then the workflow state bag.
    #[must_use]
    pub fn lookup_str(&self, turn: &'a Entities, key: &str) -> Option<&'a str> {
        lookup_str(turn, self.collected, self.workflow_state, key)
    }

    /// Same three tiers, but returning the raw JSON value (for non-string
    /// entities such as `confirmed`).
    #[must_use]
    pub fn lookup_value(&self, turn: &'a Entities, key: &str) -> Option<&'a Value> {
        [turn, self.collected, self.workflow_state]
            .into_iter()
            .find_map(|bag| bag.get(key))
    }

    /// Whether `key` resolves to a truthy value anywhere in the three tiers.
    #[must_use]
    pub fn lookup_truthy(&self, turn: &'a Entities, key: &str) -> bool {
        self.lookup_value(turn, key).is_some_and(is_truthy)
    }

    /// Whether this turn is running on the authenticated patient-portal
    /// channel with a caller bearer token attached (spec §4.7).
    #[must_use]
    pub fn is_patient_portal(&self) -> bool {
        self.channel == "patient_portal" && self.patient_token.is_some()
    }
}
