//! Lab test booking (spec §4.7 "Lab Booking"). Always hands off to a human
//! for prescription verification; the RBAC deny-list blocks `POST
//! /lab/orders` for the service account, so this workflow never creates an
//! order itself — it only confirms or narrows down which test the caller
//! means before handing off.

use std::sync::Arc;

use async_trait::async_trait;
use careline_backend::BackendClient;
use careline_core::{Entities, Intent, WorkflowResult};
use tracing::error;

use crate::context::WorkflowContext;
use crate::workflow::Workflow;

const SUPPORTED: &[Intent] = &[Intent::BookLabTest];

pub struct LabBookingWorkflow {
    backend: Arc<dyn BackendClient>,
}

impl LabBookingWorkflow {
    #[must_use]
    pub fn new(backend: Arc<dyn BackendClient>) -> Self {
        Self { backend }
    }

    async fn handle(&self, turn: &Entities, ctx: &WorkflowContext<'_>) -> WorkflowResult {
        let requested = ctx.lookup_str(turn, "test_name").or_else(|| ctx.lookup_str(turn, "name"));

        let catalog = match self.backend.list_lab_tests().await {
            Ok(tests) => tests,
            Err(e) => {
                error!(error = %e, "list_lab_tests failed");
                return WorkflowResult::reply(
                    "A lab test needs a doctor's prescription, so I'm connecting you with our lab desk now.",
                )
                .requires_human()
                .complete();
            }
        };

        if let Some(requested) = requested {
            let lower = requested.trim().to_lowercase();
            if let Some(matched) = catalog.iter().find(|t| t.name.to_lowercase().contains(&lower) || lower.contains(&t.name.to_lowercase())) {
                return WorkflowResult::reply(format!(
                    "I've noted {}. A lab test needs a doctor's prescription, so I'm connecting you with \
                     our lab desk now.",
                    matched.name
                ))
                .requires_human()
                .complete();
            }
        }

        let hints: Vec<String> = catalog.into_iter().take(5).map(|t| t.name).collect();
        if hints.is_empty() {
            WorkflowResult::reply(
                "A lab test needs a doctor's prescription, so I'm connecting you with our lab desk now.",
            )
            .requires_human()
            .complete()
        } else {
            WorkflowResult::reply(format!(
                "Which test would you like? We offer: {}. A doctor's prescription will still be needed.",
                hints.join(", ")
            ))
            .requires_human()
            .complete()
        }
    }
}

#[async_trait]
impl Workflow for LabBookingWorkflow {
    fn supported_intents(&self) -> &'static [Intent] {
        SUPPORTED
    }

    async fn execute(&self, _intent: Intent, turn_entities: &Entities, _raw_text: &str, ctx: &WorkflowContext<'_>) -> WorkflowResult {
        self.handle(turn_entities, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use careline_backend::types::LabTest;
    use careline_test::FakeBackend;

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
    async fn matched_test_name_confirms_and_escalates() {
        let backend = FakeBackend::new().with_lab_tests(vec![LabTest { id: "L1".into(), name: "Complete Blood Count".into() }]);
        let workflow = LabBookingWorkflow::new(Arc::new(backend));
        let mut turn = Entities::new();
        turn.insert("test_name".into(), serde_json::json!("blood count"));
        let collected = Entities::new();
        let state = Entities::new();
        let result = workflow.handle(&turn, &ctx(&collected, &state)).await;
        assert!(result.requires_human);
        assert!(result.response_text.contains("Complete Blood Count"));
    }

    #[tokio::test]
    async fn unmatched_test_lists_catalog_hints() {
        let backend = FakeBackend::new().with_lab_tests(vec![
            LabTest { id: "L1".into(), name: "Complete Blood Count".into() },
            LabTest { id: "L2".into(), name: "Lipid Profile".into() },
        ]);
        let workflow = LabBookingWorkflow::new(Arc::new(backend));
        let collected = Entities::new();
        let state = Entities::new();
        let result = workflow.handle(&Entities::new(), &ctx(&collected, &state)).await;
        assert!(result.requires_human);
        assert!(result.response_text.contains("Lipid Profile"));
    }
}
