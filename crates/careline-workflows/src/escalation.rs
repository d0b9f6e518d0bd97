//! Emergency reporting and direct human handoff (spec §4.7 "Escalation").
//! Both intents always finish the turn in one step; a failed emergency
//! case creation is logged but never changes the reply the caller hears —
//! the directive to head for the emergency entrance matters more than
//! whether the case record was created.

use std::sync::Arc;

use async_trait::async_trait;
use careline_backend::types::CreateEmergencyCaseRequest;
use careline_backend::BackendClient;
use careline_core::{Entities, Intent, WorkflowResult};
use tracing::warn;

use crate::context::WorkflowContext;
use crate::workflow::Workflow;

const SUPPORTED: &[Intent] = &[Intent::ReportEmergency, Intent::EscalateToHuman];

const EMERGENCY_REPLY: &str = "Please head to the emergency entrance right away, or call our ambulance \
     number if you can't get here yourself. I'm connecting you with a human now.";

pub struct EscalationWorkflow {
    backend: Arc<dyn BackendClient>,
}

impl EscalationWorkflow {
    #[must_use]
    pub fn new(backend: Arc<dyn BackendClient>) -> Self {
        Self { backend }
    }

    async fn report_emergency(&self, turn: &Entities, ctx: &WorkflowContext<'_>) -> WorkflowResult {
        if let Some(name) = ctx.lookup_str(turn, "name").or_else(|| ctx.lookup_str(turn, "first_name")) {
            let request = CreateEmergencyCaseRequest {
                patient_name: name.to_owned(),
                chief_complaint: ctx.lookup_str(turn, "chief_complaint").unwrap_or("reported by voice agent").to_owned(),
                triage_level: "red".to_owned(),
                source: "voice_agent".to_owned(),
            };
            if let Err(e) = self.backend.create_emergency_case(&request).await {
                warn!(error = %e, "create_emergency_case failed, proceeding with reply regardless");
            }
        }
        WorkflowResult::reply(EMERGENCY_REPLY).requires_human().complete()
    }
}

#[async_trait]
impl Workflow for EscalationWorkflow {
    fn supported_intents(&self) -> &'static [Intent] {
        SUPPORTED
    }

    async fn execute(&self, intent: Intent, turn_entities: &Entities, _raw_text: &str, ctx: &WorkflowContext<'_>) -> WorkflowResult {
        match intent {
            Intent::ReportEmergency => self.report_emergency(turn_entities, ctx).await,
            _ => WorkflowResult::reply("One moment, I'm transferring you to a member of our team.")
                .requires_human()
                .complete(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use careline_test::FakeBackend;
    use serde_json::json;

    fn ctx<'a>(collected: &'a Entities, state: &'a Entities) -> WorkflowContext<'a> {
        WorkflowContext {
            channel: "phone",
            patient_token: None,
            collected,
            workflow_state: state,
            turn_count: 1,
        }
    }

    #[tokio::test]
    async fn emergency_always_requires_human_even_when_case_creation_fails() {
        let backend = FakeBackend::new().with_failure("create_emergency_case");
        let workflow = EscalationWorkflow::new(Arc::new(backend));
        let mut turn = Entities::new();
        turn.insert("name".into(), json!("Ravi Kumar"));
        let collected = Entities::new();
        let state = Entities::new();
        let result = workflow.report_emergency(&turn, &ctx(&collected, &state)).await;
        assert!(result.requires_human);
        assert!(result.is_complete);
        assert!(result.response_text.to_lowercase().contains("emergency entrance"));
    }

    #[tokio::test]
    async fn escalate_to_human_transfers_immediately() {
        let workflow = EscalationWorkflow::new(Arc::new(FakeBackend::new()));
        let collected = Entities::new();
        let state = Entities::new();
        let result = workflow
            .execute(Intent::EscalateToHuman, &Entities::new(), "", &ctx(&collected, &state))
            .await;
        assert!(result.requires_human);
        assert!(result.is_complete);
    }
}
