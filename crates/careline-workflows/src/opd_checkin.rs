//! OPD check-in and queue status (spec §4.7 "OPD Check-in"). One workflow
//! instance answers both `OPD_CHECKIN` and `OPD_QUEUE_STATUS`.

use std::sync::Arc;

use async_trait::async_trait;
use careline_backend::types::Appointment;
use careline_backend::BackendClient;
use careline_core::{Entities, Intent, WorkflowResult};
use serde_json::json;
use tracing::error;

use crate::context::WorkflowContext;
use crate::patient_lookup::{resolve_patient_id, PatientLookup};
use crate::workflow::Workflow;

const SUPPORTED: &[Intent] = &[Intent::OpdCheckin, Intent::OpdQueueStatus];

pub struct OpdCheckinWorkflow {
    backend: Arc<dyn BackendClient>,
}

impl OpdCheckinWorkflow {
    #[must_use]
    pub fn new(backend: Arc<dyn BackendClient>) -> Self {
        Self { backend }
    }

    async fn checkin(&self, turn: &Entities, ctx: &WorkflowContext<'_>) -> WorkflowResult {
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
                error!(error = %e, "search_patients failed during check-in");
                return WorkflowResult::reply("I'm having trouble looking up that patient right now.")
                    .requires_human()
                    .complete();
            }
        };

        let appointments = match self.backend.list_appointments(&patient_id).await {
            Ok(appointments) => appointments.into_iter().filter(is_todays_scheduled).collect::<Vec<_>>(),
            Err(e) => {
                error!(error = %e, "list_appointments failed during check-in");
                return WorkflowResult::reply("I couldn't load today's appointments right now.")
                    .requires_human()
                    .complete();
            }
        };

        match appointments.len() {
            0 => WorkflowResult::reply(
                "I don't see a scheduled appointment for today. Would you like to book one?",
            )
            .complete(),
            1 => self.checkin_one(&appointments[0]).await,
            _ => {
                let times: Vec<String> = appointments.iter().map(|a| a.time.clone().unwrap_or_else(|| "unspecified time".to_owned())).collect();
                WorkflowResult::reply(format!(
                    "You have a few appointments today: {}. Which one would you like to check in for?",
                    times.join(", ")
                ))
                .with_context(Entities::from([("step".to_owned(), json!("disambiguate_appointment"))]))
            }
        }
    }

    async fn checkin_one(&self, appointment: &Appointment) -> WorkflowResult {
        match self.backend.checkin_appointment(&appointment.id).await {
            Ok(checked_in) => {
                let mut text = "You're checked in.".to_owned();
                if let Some(token) = &checked_in.token_number {
                    text.push_str(&format!(" Your token number is {token}."));
                }
                WorkflowResult::reply(text).complete()
            }
            Err(e) => {
                error!(error = %e, "checkin_appointment failed");
                WorkflowResult::reply("I wasn't able to check you in just now. Please see the front desk.")
                    .requires_human()
                    .complete()
            }
        }
    }

    async fn queue_status(&self) -> WorkflowResult {
        match self.backend.list_opd_queue().await {
            Ok(queue) if queue.length == 0 => WorkflowResult::reply("There's no wait right now.").complete(),
            Ok(queue) => WorkflowResult::reply(format!(
                "There are {} people ahead in the queue, roughly 15 to 20 minutes.",
                queue.length
            ))
            .complete(),
            Err(e) => {
                error!(error = %e, "list_opd_queue failed");
                WorkflowResult::reply("I couldn't check the queue right now.").complete()
            }
        }
    }
}

fn is_todays_scheduled(appointment: &Appointment) -> bool {
    appointment.status.eq_ignore_ascii_case("scheduled") || appointment.status.eq_ignore_ascii_case("booked")
}

#[async_trait]
impl Workflow for OpdCheckinWorkflow {
    fn supported_intents(&self) -> &'static [Intent] {
        SUPPORTED
    }

    async fn execute(&self, intent: Intent, turn_entities: &Entities, _raw_text: &str, ctx: &WorkflowContext<'_>) -> WorkflowResult {
        match intent {
            Intent::OpdQueueStatus => self.queue_status().await,
            _ => self.checkin(turn_entities, ctx).await,
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
        self.checkin(all_entities, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use careline_backend::types::{Patient, QueueStatus};
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
    async fn checks_in_the_sole_scheduled_appointment() {
        let backend = FakeBackend::new()
            .with_patients(vec![Patient {
                id: "P1".into(),
                first_name: "Ravi".into(),
                last_name: "Kumar".into(),
                phone: "9876543210".into(),
                date_of_birth: None,
                gender: None,
            }])
            .with_appointments(vec![Appointment {
                id: "A1".into(),
                appointment_number: Some("APT-1".into()),
                token_number: Some("T5".into()),
                status: "scheduled".into(),
                date: "2026-07-28".into(),
                time: Some("09:00".into()),
                doctor_name: None,
                department: None,
            }]);
        let workflow = OpdCheckinWorkflow::new(Arc::new(backend));
        let mut turn = Entities::new();
        turn.insert("phone".into(), json!("9876543210"));
        let collected = Entities::new();
        let state = Entities::new();
        let result = workflow.checkin(&turn, &ctx(&collected, &state)).await;
        assert!(result.is_complete);
        assert!(result.response_text.contains("T5"));
    }

    #[tokio::test]
    async fn empty_queue_reports_no_wait() {
        let backend = FakeBackend::new().with_queue(QueueStatus { length: 0 });
        let workflow = OpdCheckinWorkflow::new(Arc::new(backend));
        let result = workflow.queue_status().await;
        assert!(result.response_text.to_lowercase().contains("no wait"));
    }

    #[tokio::test]
    async fn nonempty_queue_reports_estimate() {
        let backend = FakeBackend::new().with_queue(QueueStatus { length: 4 });
        let workflow = OpdCheckinWorkflow::new(Arc::new(backend));
        let result = workflow.queue_status().await;
        assert!(result.response_text.contains('4'));
        assert!(result.response_text.contains("15"));
    }
}
