//! Bed availability and admission requests (spec §4.7 "Bed Allocation").
//! `CHECK_BED_AVAILABILITY` always completes in one turn; the allocation
//! and admission intents collect a patient identifier and then always
//! escalate — this workflow never calls the allocation/admission APIs
//! itself, since doctor approval is required upstream.

use std::sync::Arc;

use async_trait::async_trait;
use careline_backend::BackendClient;
use careline_core::{Entities, Intent, WorkflowResult};
use serde_json::json;
use tracing::error;

use crate::context::WorkflowContext;
use crate::patient_lookup::{resolve_patient_id, PatientLookup};
use crate::workflow::Workflow;

const SUPPORTED: &[Intent] = &[
    Intent::CheckBedAvailability,
    Intent::RequestBedAllocation,
    Intent::RequestAdmission,
];

pub struct BedWorkflow {
    backend: Arc<dyn BackendClient>,
}

impl BedWorkflow {
    #[must_use]
    pub fn new(backend: Arc<dyn BackendClient>) -> Self {
        Self { backend }
    }

    async fn check_availability(&self) -> WorkflowResult {
        match self.backend.bed_availability().await {
            Ok(summary) => WorkflowResult::reply(format!(
                "We currently have {} general, {} private, and {} ICU beds available.",
                summary.general, summary.private, summary.icu
            ))
            .complete(),
            Err(e) => {
                error!(error = %e, "bed_availability failed");
                WorkflowResult::reply("I couldn't check bed availability right now. Please ask at the front desk.").complete()
            }
        }
    }

    async fn request_admission(&self, turn: &Entities, ctx: &WorkflowContext<'_>) -> WorkflowResult {
        match resolve_patient_id(self.backend.as_ref(), turn, ctx).await {
            Ok(PatientLookup::Resolved(_)) => WorkflowResult::reply(
                "A bed or admission request needs a doctor's approval. I'm connecting you with our \
                 admissions desk now.",
            )
            .requires_human()
            .complete(),
            Ok(PatientLookup::MissingIdentifier) => {
                WorkflowResult::reply("Could you share the patient's ID or phone number first?")
                    .with_context(Entities::from([("step".to_owned(), json!("need_patient_id"))]))
            }
            Ok(PatientLookup::NotFound) => WorkflowResult::reply(
                "I couldn't find that patient, but I'll still connect you with our admissions desk.",
            )
            .requires_human()
            .complete(),
            Ok(PatientLookup::Ambiguous(matches)) => {
                let names: Vec<String> = matches.iter().take(3).map(|p| format!("{} {}", p.first_name, p.last_name)).collect();
                WorkflowResult::reply(format!(
                    "I found a few matching patients: {}. Could you share the patient ID instead?",
                    names.join(", ")
                ))
                .with_context(Entities::from([("step".to_owned(), json!("need_patient_id"))]))
            }
            Err(e) => {
                error!(error = %e, "search_patients failed during admission request");
                WorkflowResult::reply("Let me connect you with our admissions desk.").requires_human().complete()
            }
        }
    }
}

#[async_trait]
impl Workflow for BedWorkflow {
    fn supported_intents(&self) -> &'static [Intent] {
        SUPPORTED
    }

    async fn execute(&self, intent: Intent, turn_entities: &Entities, _raw_text: &str, ctx: &WorkflowContext<'_>) -> WorkflowResult {
        match intent {
            Intent::CheckBedAvailability => self.check_availability().await,
            _ => self.request_admission(turn_entities, ctx).await,
        }
    }

    async fn continue_workflow(
        &self,
        _new_entities: &Entities,
        all_entities: &Entities,
        _raw_text: &str,
        ctx: &WorkflowContext<'_>,
        _is_confirmation: bool,
        _is_denial: bool,
    ) -> WorkflowResult {
        self.request_admission(all_entities, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use careline_backend::types::{BedAvailability, Patient};
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
    async fn reports_bed_counts_by_type() {
        let backend = FakeBackend::new().with_bed_availability(BedAvailability { general: 3, private: 1, icu: 0 });
        let workflow = BedWorkflow::new(Arc::new(backend));
        let result = workflow.check_availability().await;
        assert!(result.is_complete);
        assert!(result.response_text.contains('3'));
        assert!(result.response_text.contains("ICU"));
    }

    #[tokio::test]
    async fn admission_request_always_escalates_once_patient_resolved() {
        let backend = FakeBackend::new().with_patients(vec![Patient {
            id: "P1".into(),
            first_name: "Ravi".into(),
            last_name: "Kumar".into(),
            phone: "9876543210".into(),
            date_of_birth: None,
            gender: None,
        }]);
        let workflow = BedWorkflow::new(Arc::new(backend));
        let mut turn = Entities::new();
        turn.insert("patient_id".into(), json!("P1"));
        let collected = Entities::new();
        let state = Entities::new();
        let result = workflow.request_admission(&turn, &ctx(&collected, &state)).await;
        assert!(result.requires_human);
        assert!(result.is_complete);
    }

    #[tokio::test]
    async fn admission_request_asks_for_identifier_when_missing() {
        let workflow = BedWorkflow::new(Arc::new(FakeBackend::new()));
        let collected = Entities::new();
        let state = Entities::new();
        let result = workflow.request_admission(&Entities::new(), &ctx(&collected, &state)).await;
        assert!(!result.is_complete);
        assert!(result.response_text.to_lowercase().contains("patient"));
    }
}
