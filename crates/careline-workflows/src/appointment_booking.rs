//! Service-account appointment booking (spec §4.7 "Appointment Booking
//! (service-account variant)"). States, in order: `need_patient_id` →
//! `need_department` → `select_doctor` → `need_date` →
//! `awaiting_confirmation` → terminal.

use std::sync::Arc;

use async_trait::async_trait;
use careline_backend::types::{CreateAppointmentRequest, Doctor};
use careline_backend::BackendClient;
use careline_core::{Entities, Intent, ValidationOutcome, WorkflowResult};
use careline_dialog::EntityValidator;
use serde_json::{json, Value};
use tracing::{error, warn};

use crate::context::WorkflowContext;
use crate::patient_lookup::{resolve_patient_id, PatientLookup};
use crate::workflow::Workflow;

const SUPPORTED: &[Intent] = &[
    Intent::BookAppointment,
    Intent::RescheduleAppointment,
    Intent::CancelAppointment,
];

/// Books, and (by handing off) reschedules or cancels, OPD appointments
/// against the service-account backend surface.
pub struct AppointmentBookingWorkflow {
    backend: Arc<dyn BackendClient>,
    validator: EntityValidator,
}

impl AppointmentBookingWorkflow {
    #[must_use]
    pub fn new(backend: Arc<dyn BackendClient>) -> Self {
        Self {
            backend,
            validator: EntityValidator::new(),
        }
    }

    async fn advance(&self, turn: &Entities, ctx: &WorkflowContext<'_>, raw_text: &str) -> WorkflowResult {
        let patient_id = match resolve_patient_id(self.backend.as_ref(), turn, ctx).await {
            Ok(PatientLookup::Resolved(id)) => id,
            Ok(PatientLookup::MissingIdentifier) => {
                return WorkflowResult::reply("Could you share the patient's ID or phone number?")
                    .with_context(Entities::from([("step".to_owned(), json!("need_patient_id"))]));
            }
            Ok(PatientLookup::NotFound) => {
                let phone = ctx.lookup_str(turn, "phone").unwrap_or_default().to_owned();
                return WorkflowResult::reply(
                    "I couldn't find a patient with that phone number. Would you like to register as a \
                     new patient first?",
                )
                .with_context(Entities::from([
                    ("step".to_owned(), json!("need_patient_id")),
                    ("phone".to_owned(), json!(phone)),
                ]));
            }
            Ok(PatientLookup::Ambiguous(matches)) => {
                let names: Vec<String> = matches
                    .iter()
                    .take(3)
                    .map(|p| format!("{} {}", p.first_name, p.last_name))
                    .collect();
                return WorkflowResult::reply(format!(
                    "I found a few matching patients: {}. Could you share the patient ID instead?",
                    names.join(", ")
                ))
                .with_context(Entities::from([("step".to_owned(), json!("need_patient_id"))]));
            }
            Err(e) => {
                error!(error = %e, "search_patients failed during appointment booking");
                return WorkflowResult::reply(
                    "I'm having trouble looking up that patient right now. Let me connect you with our \
                     front desk.",
                )
                .requires_human()
                .complete();
            }
        };

        let department = match ctx.lookup_str(turn, "department") {
            Some(raw) => match self.validator.validate_department(raw) {
                ValidationOutcome::Valid { normalized } => normalized,
                _ => return self.ask_for_department(&patient_id).await,
            },
            None => return self.ask_for_department(&patient_id).await,
        };

        let available_doctors = self.doctor_offer(&department).await;
        let (available_doctors, doctor) = match available_doctors {
            Ok(doctors) => {
                let already_offered = ctx.lookup_truthy(turn, "doctor_offered");
                if !already_offered {
                    return self.offer_doctors(&patient_id, &department, &doctors);
                }
                let doctor = self.match_doctor(raw_text, turn, ctx, &doctors);
                (doctors, doctor)
            }
            Err(e) => {
                error!(error = %e, "list_doctors failed");
                (Vec::new(), None)
            }
        };

        let date_raw = ctx.lookup_str(turn, "preferred_date").or_else(|| ctx.lookup_str(turn, "date"));
        let scheduled_date = match date_raw {
            Some(raw) => match self.validator.validate_date(raw, false, 90) {
                ValidationOutcome::Valid { normalized } => normalized,
                ValidationOutcome::Invalid { error } => {
                    return self.ask_for_date(&patient_id, &department, &available_doctors, &error);
                }
                ValidationOutcome::NeedsConfirmation { .. } => {
                    return self.ask_for_date(
                        &patient_id,
                        &department,
                        &available_doctors,
                        "I couldn't quite understand that date.",
                    );
                }
            },
            None => return self.ask_for_date(&patient_id, &department, &available_doctors, ""),
        };

        let confirmed = ctx.lookup_truthy(turn, "confirmed");
        if !confirmed {
            let doctor_phrase = doctor
                .as_ref()
                .map_or_else(|| "the next available doctor".to_owned(), |d| format!("Dr. {} {}", d.first_name, d.last_name));
            let summary = format!(
                "Let me confirm: an OPD appointment in {department} with {doctor_phrase} on {scheduled_date}. \
                 Shall I book it?"
            );
            return WorkflowResult::reply(summary).with_context(Entities::from([
                ("step".to_owned(), json!("awaiting_confirmation")),
                ("patient_id".to_owned(), json!(patient_id)),
                ("department".to_owned(), json!(department)),
                ("preferred_date".to_owned(), json!(scheduled_date)),
                ("doctor_offered".to_owned(), json!(true)),
                (
                    "doctor".to_owned(),
                    doctor.as_ref().map_or(Value::Null, |d| json!(format!("{} {}", d.first_name, d.last_name))),
                ),
            ]));
        }

        let request = CreateAppointmentRequest {
            patient: patient_id,
            department: department.clone(),
            scheduled_date,
            appointment_type: "opd".to_owned(),
            doctor: doctor.map(|d| format!("{} {}", d.first_name, d.last_name)),
            chief_complaint: None,
        };
        match self.backend.create_appointment(&request).await {
            Ok(appointment) => {
                let number = appointment.appointment_number.unwrap_or_else(|| appointment.id.clone());
                let token = appointment.token_number.unwrap_or_else(|| "pending".to_owned());
                WorkflowResult::reply(format!(
                    "You're booked. Your appointment number is {number} and your token number is {token}."
                ))
                .complete()
            }
            Err(e) => {
                error!(error = %e, "create_appointment failed");
                WorkflowResult::reply(
                    "I wasn't able to complete the booking just now. Let me connect you with our front desk.",
                )
                .requires_human()
                .complete()
            }
        }
    }

    async fn ask_for_department(&self, patient_id: &str) -> WorkflowResult {
        let hints = match self.backend.list_departments().await {
            Ok(departments) => departments
                .iter()
                .take(5)
                .map(|d| d.name.clone())
                .collect::<Vec<_>>()
                .join(", "),
            Err(e) => {
                warn!(error = %e, "list_departments failed while prompting");
                String::new()
            }
        };
        let prompt = if hints.is_empty() {
            "Which department would you like to book with?".to_owned()
        } else {
            format!("Which department would you like to book with? For example: {hints}.")
        };
        WorkflowResult::reply(prompt).with_context(Entities::from([
            ("step".to_owned(), json!("need_department")),
            ("patient_id".to_owned(), json!(patient_id)),
        ]))
    }

    async fn doctor_offer(&self, department: &str) -> careline_backend::BackendResult<Vec<Doctor>> {
        let department_id = self
            .backend
            .list_departments()
            .await?
            .into_iter()
            .find(|d| d.name.eq_ignore_ascii_case(department))
            .map(|d| d.id)
            .unwrap_or_default();
        self.backend.list_doctors(&department_id).await
    }

    fn offer_doctors(&self, patient_id: &str, department: &str, doctors: &[Doctor]) -> WorkflowResult {
        let names: Vec<String> = doctors.iter().take(3).map(|d| format!("Dr. {} {}", d.first_name, d.last_name)).collect();
        let available = serde_json::to_value(doctors).unwrap_or(serde_json::Value::Null);
        let prompt = if names.is_empty() {
            "I don't have a doctor list for that department right now, but I can book you with the next \
             available doctor. When would you like to come in?"
                .to_owned()
        } else {
            format!("We have {} available, or any available doctor. Who would you prefer?", names.join(", "))
        };
        WorkflowResult::reply(prompt).with_context(Entities::from([
            ("step".to_owned(), json!("select_doctor")),
            ("patient_id".to_owned(), json!(patient_id)),
            ("department".to_owned(), json!(department)),
            ("available_doctors".to_owned(), available),
            ("doctor_offered".to_owned(), json!(true)),
        ]))
    }

    /// Match the caller's raw utterance against the offered doctors' first,
    /// last, or full names (spec §4.7 step 3). Falls back to the sole
    /// listed doctor when the caller simply affirms and exactly one
    /// candidate remains (spec §9 resolved open question).
    fn match_doctor(&self, raw_text: &str, turn: &Entities, ctx: &WorkflowContext<'_>, doctors: &[Doctor]) -> Option<Doctor> {
        if let Some(name) = ctx.lookup_str(turn, "name") {
            if let Some(found) = find_doctor_by_name(doctors, name) {
                return Some(found);
            }
        }
        if let Some(found) = find_doctor_by_name(doctors, raw_text) {
            return Some(found);
        }
        if doctors.len() == 1 && (crate::raw_match::is_affirmation(raw_text)) {
            tracing::debug!("lone doctor selected by affirmation with no name match");
            return Some(doctors[0].clone());
        }
        None
    }

    fn ask_for_date(&self, patient_id: &str, department: &str, available_doctors: &[Doctor], error: &str) -> WorkflowResult {
        let prefix = if error.is_empty() { String::new() } else { format!("{error} ") };
        let available = serde_json::to_value(available_doctors).unwrap_or(serde_json::Value::Null);
        WorkflowResult::reply(format!("{prefix}What date would you like to come in?")).with_context(Entities::from([
            ("step".to_owned(), json!("need_date")),
            ("patient_id".to_owned(), json!(patient_id)),
            ("department".to_owned(), json!(department)),
            ("available_doctors".to_owned(), available),
            ("doctor_offered".to_owned(), json!(true)),
        ]))
    }
}

fn find_doctor_by_name(doctors: &[Doctor], candidate: &str) -> Option<Doctor> {
    let lower = candidate.trim().to_lowercase();
    if lower.is_empty() {
        return None;
    }
    doctors
        .iter()
        .find(|d| {
            let first = d.first_name.to_lowercase();
            let last = d.last_name.to_lowercase();
            let full = format!("{first} {last}");
            lower.contains(&first) || lower.contains(&last) || lower.contains(&full) || full.contains(&lower)
        })
        .cloned()
}

#[async_trait]
impl Workflow for AppointmentBookingWorkflow {
    fn supported_intents(&self) -> &'static [Intent] {
        SUPPORTED
    }

    async fn execute(&self, intent: Intent, turn_entities: &Entities, raw_text: &str, ctx: &WorkflowContext<'_>) -> WorkflowResult {
        match intent {
            Intent::RescheduleAppointment | Intent::CancelAppointment => WorkflowResult::reply(
                "Changing or cancelling an existing appointment needs to go through our front desk. Let me \
                 connect you.",
            )
            .requires_human()
            .complete(),
            _ => self.advance(turn_entities, ctx, raw_text).await,
        }
    }

    async fn continue_workflow(
        &self,
        _new_entities: &Entities,
        all_entities: &Entities,
        raw_text: &str,
        ctx: &WorkflowContext<'_>,
        is_confirmation: bool,
        is_denial: bool,
    ) -> WorkflowResult {
        let step = ctx.workflow_state.get("step").and_then(Value::as_str).unwrap_or_default();
        if step == "awaiting_confirmation" && is_denial {
            return WorkflowResult::reply("No problem. What date would you like instead?").with_context(Entities::from([
                ("step".to_owned(), json!("need_date")),
                ("confirmed".to_owned(), json!(false)),
            ]));
        }
        let mut entities = all_entities.clone();
        if step == "awaiting_confirmation" && is_confirmation {
            entities.insert("confirmed".to_owned(), json!(true));
        }
        self.advance(&entities, ctx, raw_text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use careline_backend::types::{Appointment, Department, Patient};
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

    fn backend_with_fixtures() -> FakeBackend {
        FakeBackend::new()
            .with_patients(vec![Patient {
                id: "P000222".into(),
                first_name: "Ravi".into(),
                last_name: "Kumar".into(),
                phone: "9876543210".into(),
                date_of_birth: None,
                gender: None,
            }])
            .with_departments(vec![Department { id: "D1".into(), name: "Cardiology".into() }])
            .with_doctors(vec![Doctor {
                id: "DOC1".into(),
                first_name: "Anita".into(),
                last_name: "Sharma".into(),
                department_id: Some("D1".into()),
            }])
            .with_created_appointment(Appointment {
                id: "A0001".into(),
                appointment_number: Some("APT-100".into()),
                token_number: Some("T12".into()),
                status: "booked".into(),
                date: "2026-08-01".into(),
                time: None,
                doctor_name: Some("Anita Sharma".into()),
                department: Some("Cardiology".into()),
            })
    }

    #[tokio::test]
    async fn asks_for_patient_identifier_first() {
        let workflow = AppointmentBookingWorkflow::new(Arc::new(backend_with_fixtures()));
        let collected = Entities::new();
        let state = Entities::new();
        let result = workflow.advance(&Entities::new(), &ctx(&collected, &state), "").await;
        assert!(result.response_text.to_lowercase().contains("patient"));
        assert!(!result.is_complete);
    }

    #[tokio::test]
    async fn full_happy_path_books_appointment() {
        let backend = Arc::new(backend_with_fixtures());
        let workflow = AppointmentBookingWorkflow::new(backend);

        let mut collected = Entities::new();
        collected.insert("phone".into(), json!("9876543210"));
        let state = Entities::new();
        let r1 = workflow.advance(&Entities::new(), &ctx(&collected, &state), "").await;
        assert!(r1.response_text.to_lowercase().contains("department"));

        let mut state2 = Entities::new();
        state2.insert("patient_id".into(), json!("P000222"));
        collected.insert("department".into(), json!("Cardiology"));
        let r2 = workflow.advance(&Entities::new(), &ctx(&collected, &state2), "").await;
        assert!(r2.response_text.contains("Sharma"));

        let mut state3 = state2.clone();
        state3.insert("department".into(), json!("Cardiology"));
        state3.insert("doctor_offered".into(), json!(true));
        let r3 = workflow.advance(&Entities::new(), &ctx(&collected, &state3), "Dr. Sharma").await;
        assert!(r3.response_text.to_lowercase().contains("date"));

        let mut state4 = state3.clone();
        collected.insert("preferred_date".into(), json!("tomorrow"));
        let r4 = workflow.advance(&Entities::new(), &ctx(&collected, &state4), "Dr. Sharma").await;
        assert!(r4.response_text.to_lowercase().contains("confirm") || r4.response_text.to_lowercase().contains("shall"));

        state4.insert("confirmed".into(), json!(true));
        let r5 = workflow.advance(&Entities::new(), &ctx(&collected, &state4), "").await;
        assert!(r5.is_complete);
        assert!(r5.response_text.contains("APT-100"));
        assert!(r5.response_text.contains("T12"));
    }

    #[tokio::test]
    async fn reschedule_and_cancel_always_hand_off() {
        let workflow = AppointmentBookingWorkflow::new(Arc::new(backend_with_fixtures()));
        let collected = Entities::new();
        let state = Entities::new();
        let result = workflow
            .execute(Intent::CancelAppointment, &Entities::new(), "", &ctx(&collected, &state))
            .await;
        assert!(result.requires_human);
        assert!(result.is_complete);
    }
}
