//! Status inquiry across lab, billing, and appointments (spec §4.7 "Status
//! Inquiry"). Resolves the patient once, then routes to a dedicated fetch
//! per sub-intent; every dedicated fetch finishes the workflow in one turn
//! whether it succeeds or the backend call fails.

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
    Intent::CheckLabStatus,
    Intent::CheckBillStatus,
    Intent::CheckAppointmentStatus,
    Intent::GeneralStatusInquiry,
];

pub struct StatusInquiryWorkflow {
    backend: Arc<dyn BackendClient>,
}

impl StatusInquiryWorkflow {
    #[must_use]
    pub fn new(backend: Arc<dyn BackendClient>) -> Self {
        Self { backend }
    }

    async fn handle(&self, intent: Intent, turn: &Entities, ctx: &WorkflowContext<'_>) -> WorkflowResult {
        let patient_id = match resolve_patient_id(self.backend.as_ref(), turn, ctx).await {
            Ok(PatientLookup::Resolved(id)) => id,
            Ok(PatientLookup::MissingIdentifier) => {
                return WorkflowResult::reply("Could you share the patient's ID or phone number?")
                    .with_context(Entities::from([("step".to_owned(), json!("need_patient_id"))]));
            }
            Ok(PatientLookup::NotFound) => {
                return WorkflowResult::reply("I couldn't find a patient with that phone number.").complete();
            }
            Ok(PatientLookup::Ambiguous(matches)) => {
                let names: Vec<String> = matches.iter().take(3).map(|p| format!("{} {}", p.first_name, p.last_name)).collect();
                return WorkflowResult::reply(format!(
                    "I found a few matching patients: {}. Could you share the patient ID instead?",
                    names.join(", ")
                ))
                .with_context(Entities::from([("step".to_owned(), json!("need_patient_id"))]));
            }
            Err(e) => {
                error!(error = %e, "search_patients failed during status inquiry");
                return WorkflowResult::reply("I'm having trouble looking up that patient right now.")
                    .requires_human()
                    .complete();
            }
        };

        match intent {
            Intent::CheckLabStatus => self.lab_status(&patient_id).await,
            Intent::CheckBillStatus => self.bill_status(&patient_id).await,
            Intent::CheckAppointmentStatus => self.appointment_status(&patient_id).await,
            Intent::GeneralStatusInquiry => WorkflowResult::reply(
                "What would you like to check: your lab results, your bill, or your appointment?",
            )
            .with_context(Entities::from([
                ("step".to_owned(), json!("need_sub_intent")),
                ("patient_id".to_owned(), json!(patient_id)),
            ])),
            _ => WorkflowResult::reply("What would you like to check?"),
        }
    }

    async fn lab_status(&self, patient_id: &str) -> WorkflowResult {
        match self.backend.list_lab_orders(patient_id).await {
            Ok(orders) => {
                let ready = orders.iter().filter(|o| o.status.eq_ignore_ascii_case("ready")).count();
                let in_progress = orders.len().saturating_sub(ready);
                WorkflowResult::reply(format!("You have {ready} result(s) ready and {in_progress} still in progress.")).complete()
            }
            Err(e) => {
                error!(error = %e, "list_lab_orders failed");
                WorkflowResult::reply("I couldn't check lab status right now. Please ask at the lab desk.").complete()
            }
        }
    }

    async fn bill_status(&self, patient_id: &str) -> WorkflowResult {
        match self.backend.list_patient_bills(patient_id).await {
            Ok(bills) => {
                let pending: Vec<_> = bills.iter().filter(|b| !b.status.eq_ignore_ascii_case("paid")).collect();
                let balance: f64 = pending.iter().map(|b| b.total_amount - b.paid_amount).sum();
                WorkflowResult::reply(format!(
                    "You have {} pending bill(s) totaling {balance:.2}.",
                    pending.len()
                ))
                .complete()
            }
            Err(e) => {
                error!(error = %e, "list_patient_bills failed");
                WorkflowResult::reply("I couldn't check billing status right now. Please ask at the billing desk.").complete()
            }
        }
    }

    async fn appointment_status(&self, patient_id: &str) -> WorkflowResult {
        match self.backend.list_appointments(patient_id).await {
            Ok(appointments) if appointments.is_empty() => {
                WorkflowResult::reply("You don't have any upcoming appointments. Would you like to book one?").complete()
            }
            Ok(appointments) => {
                let next = &appointments[0];
                let department = next.department.clone().unwrap_or_else(|| "the department".to_owned());
                let time = next.time.clone().map_or_else(String::new, |t| format!(" at {t}"));
                WorkflowResult::reply(format!("Your next appointment is on {}{time} in {department}.", next.date)).complete()
            }
            Err(e) => {
                error!(error = %e, "list_appointments failed");
                WorkflowResult::reply("I couldn't check your appointments right now. Please ask at the front desk.").complete()
            }
        }
    }
}

#[async_trait]
impl Workflow for StatusInquiryWorkflow {
    fn supported_intents(&self) -> &'static [Intent] {
        SUPPORTED
    }

    async fn execute(&self, intent: Intent, turn_entities: &Entities, _raw_text: &str, ctx: &WorkflowContext<'_>) -> WorkflowResult {
        self.handle(intent, turn_entities, ctx).await
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
        self.handle(Intent::GeneralStatusInquiry, all_entities, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use careline_backend::types::{Bill, LabOrder, Patient};
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
    async fn lab_status_counts_ready_vs_in_progress() {
        let backend = FakeBackend::new()
            .with_patients(vec![Patient {
                id: "P1".into(),
                first_name: "Ravi".into(),
                last_name: "Kumar".into(),
                phone: "9876543210".into(),
                date_of_birth: None,
                gender: None,
            }])
            .with_lab_orders(vec![
                LabOrder { id: "L1".into(), status: "ready".into(), test_name: Some("CBC".into()) },
                LabOrder { id: "L2".into(), status: "in_progress".into(), test_name: Some("Lipid".into()) },
            ]);
        let workflow = StatusInquiryWorkflow::new(Arc::new(backend));
        let mut turn = Entities::new();
        turn.insert("patient_id".into(), json!("P1"));
        let collected = Entities::new();
        let state = Entities::new();
        let result = workflow.handle(Intent::CheckLabStatus, &turn, &ctx(&collected, &state)).await;
        assert!(result.is_complete);
        assert!(result.response_text.contains('1'));
    }

    #[tokio::test]
    async fn bill_status_sums_pending_balance() {
        let backend = FakeBackend::new()
            .with_patients(vec![Patient {
                id: "P1".into(),
                first_name: "Ravi".into(),
                last_name: "Kumar".into(),
                phone: "9876543210".into(),
                date_of_birth: None,
                gender: None,
            }])
            .with_bills(vec![Bill { id: "B1".into(), status: "pending".into(), total_amount: 1500.0, paid_amount: 500.0 }]);
        let workflow = StatusInquiryWorkflow::new(Arc::new(backend));
        let mut turn = Entities::new();
        turn.insert("patient_id".into(), json!("P1"));
        let collected = Entities::new();
        let state = Entities::new();
        let result = workflow.handle(Intent::CheckBillStatus, &turn, &ctx(&collected, &state)).await;
        assert!(result.is_complete);
        assert!(result.response_text.contains("1000"));
    }

    #[tokio::test]
    async fn failed_backend_call_still_completes_the_turn() {
        let backend = FakeBackend::new()
            .with_patients(vec![Patient {
                id: "P1".into(),
                first_name: "Ravi".into(),
                last_name: "Kumar".into(),
                phone: "9876543210".into(),
                date_of_birth: None,
                gender: None,
            }])
            .with_failure("list_lab_orders");
        let workflow = StatusInquiryWorkflow::new(Arc::new(backend));
        let mut turn = Entities::new();
        turn.insert("patient_id".into(), json!("P1"));
        let collected = Entities::new();
        let state = Entities::new();
        let result = workflow.handle(Intent::CheckLabStatus, &turn, &ctx(&collected, &state)).await;
        assert!(result.is_complete);
    }
}
