//! Patient-portal appointment booking (spec §4.7 "Appointment Booking
//! (patient-portal variant)"). States: `select_department` →
//! `select_doctor` → `need_date` → `select_time` → `awaiting_confirmation`
//! → terminal. Every call uses the caller's own bearer token against the
//! `/patient/...` backend namespace rather than the service account.

use std::sync::Arc;

use async_trait::async_trait;
use careline_backend::types::{Doctor, PortalBookingRequest, Slot};
use careline_backend::BackendClient;
use careline_core::{Entities, Intent, ValidationOutcome, WorkflowResult};
use careline_dialog::EntityValidator;
use serde_json::json;
use tracing::error;

use crate::context::WorkflowContext;
use crate::raw_match::{is_affirmation, is_denial};
use crate::workflow::Workflow;

const SUPPORTED: &[Intent] = &[
    Intent::BookAppointment,
    Intent::RescheduleAppointment,
    Intent::CancelAppointment,
    Intent::CheckAppointmentStatus,
    Intent::GeneralStatusInquiry,
];

const DEFAULT_TIME: &str = "10:00";

/// Books an appointment on behalf of an authenticated patient-portal caller.
pub struct PortalAppointmentWorkflow {
    backend: Arc<dyn BackendClient>,
    validator: EntityValidator,
}

impl PortalAppointmentWorkflow {
    #[must_use]
    pub fn new(backend: Arc<dyn BackendClient>) -> Self {
        Self {
            backend,
            validator: EntityValidator::new(),
        }
    }

    async fn advance(&self, turn: &Entities, ctx: &WorkflowContext<'_>, raw_text: &str) -> WorkflowResult {
        let Some(token) = ctx.patient_token else {
            return WorkflowResult::reply(
                "I can't access your appointments without signing you in. Please try again from the app.",
            )
            .complete();
        };

        if ctx.lookup_truthy(turn, "status_inquiry") {
            return self.list_appointments(token).await;
        }

        let department = match ctx.lookup_str(turn, "department") {
            Some(raw) => match self.validator.validate_department(raw) {
                ValidationOutcome::Valid { normalized } => Some(normalized),
                _ => None,
            },
            None => None,
        };
        let Some(department) = department else {
            return self.ask_for_department(token).await;
        };

        let doctors = match self.portal_doctors(token, &department).await {
            Ok(doctors) => doctors,
            Err(e) => {
                error!(error = %e, "portal_list_doctors failed");
                return WorkflowResult::reply(
                    "I couldn't load the doctor list right now. Let me connect you with our front desk.",
                )
                .requires_human()
                .complete();
            }
        };

        let doctor_offered = ctx.lookup_truthy(turn, "doctor_offered");
        if !doctor_offered {
            return self.offer_doctors(&department, &doctors);
        }

        let doctor = self.match_doctor(raw_text, turn, ctx, &doctors);
        let Some(doctor) = doctor else {
            return self.offer_doctors(&department, &doctors);
        };

        let date_raw = ctx.lookup_str(turn, "preferred_date").or_else(|| ctx.lookup_str(turn, "date"));
        let scheduled_date = match date_raw {
            Some(raw) => match self.validator.validate_date(raw, false, 90) {
                ValidationOutcome::Valid { normalized } => normalized,
                _ => {
                    return self.ask_for_date(&department, &doctor, "I couldn't understand that date.");
                }
            },
            None => return self.ask_for_date(&department, &doctor, ""),
        };

        let slots = match self.backend.portal_list_slots(token, &doctor.id, &scheduled_date).await {
            Ok(slots) => slots.into_iter().filter(|s| s.available).collect::<Vec<_>>(),
            Err(e) => {
                error!(error = %e, "portal_list_slots failed");
                Vec::new()
            }
        };

        let time_requested = ctx.lookup_str(turn, "time").map(ToOwned::to_owned);
        let time = match time_requested {
            Some(t) if slots.iter().any(|s| s.time == t) => Some(t),
            Some(_) if !slots.is_empty() => None,
            Some(t) => Some(t),
            None => None,
        };
        let Some(time) = time else {
            return self.ask_for_time(&department, &doctor, &scheduled_date, &slots);
        };

        let affirmed = ctx.lookup_truthy(turn, "confirmed") || is_affirmation(raw_text);
        let denied = is_denial(raw_text);
        if denied {
            return WorkflowResult::reply("No problem, what date would you prefer instead?").with_context(Entities::from([
                ("step".to_owned(), json!("need_date")),
                ("department".to_owned(), json!(department)),
                ("doctor_id".to_owned(), json!(doctor.id)),
                ("doctor_offered".to_owned(), json!(true)),
            ]));
        }
        if !affirmed {
            let summary = format!(
                "Let me confirm: an appointment with Dr. {} {} in {department} on {scheduled_date} at {time}. \
                 Shall I book it?",
                doctor.first_name, doctor.last_name
            );
            return WorkflowResult::reply(summary).with_context(Entities::from([
                ("step".to_owned(), json!("awaiting_confirmation")),
                ("department".to_owned(), json!(department)),
                ("doctor_id".to_owned(), json!(doctor.id)),
                ("doctor_offered".to_owned(), json!(true)),
                ("preferred_date".to_owned(), json!(scheduled_date)),
                ("time".to_owned(), json!(time)),
            ]));
        }

        let department_id = match self.backend.portal_list_departments(token).await {
            Ok(departments) => departments
                .into_iter()
                .find(|d| d.name.eq_ignore_ascii_case(&department))
                .map(|d| d.id)
                .unwrap_or_default(),
            Err(_) => String::new(),
        };
        let request = PortalBookingRequest {
            doctor_id: doctor.id,
            department_id,
            date: scheduled_date,
            time: if time.is_empty() { DEFAULT_TIME.to_owned() } else { time },
            notes: None,
        };
        match self.backend.portal_book_appointment(token, &request).await {
            Ok(appointment) => WorkflowResult::reply(format!(
                "You're all set. Your appointment id is {}.",
                appointment.appointment_number.unwrap_or(appointment.id)
            ))
            .complete(),
            Err(e) => {
                error!(error = %e, "portal_book_appointment failed");
                WorkflowResult::reply(
                    "I wasn't able to complete the booking just now. Please try again shortly or contact \
                     the front desk.",
                )
                .requires_human()
                .complete()
            }
        }
    }

    async fn list_appointments(&self, token: &str) -> WorkflowResult {
        match self.backend.portal_list_appointments(token).await {
            Ok(appointments) if appointments.is_empty() => {
                WorkflowResult::reply("You don't have any upcoming appointments. Would you like to book one?").complete()
            }
            Ok(appointments) => {
                let next = &appointments[0];
                WorkflowResult::reply(format!(
                    "Your next appointment is on {} with {}.",
                    next.date,
                    next.doctor_name.clone().unwrap_or_else(|| "your doctor".to_owned())
                ))
                .complete()
            }
            Err(e) => {
                error!(error = %e, "portal_list_appointments failed");
                WorkflowResult::reply("I couldn't load your appointments just now. Please try again shortly.").complete()
            }
        }
    }

    async fn ask_for_department(&self, token: &str) -> WorkflowResult {
        let hints = self
            .backend
            .portal_list_departments(token)
            .await
            .map(|departments| departments.iter().take(5).map(|d| d.name.clone()).collect::<Vec<_>>().join(", "))
            .unwrap_or_default();
        let prompt = if hints.is_empty() {
            "Which department would you like to book with?".to_owned()
        } else {
            format!("Which department would you like to book with? For example: {hints}.")
        };
        WorkflowResult::reply(prompt).with_context(Entities::from([("step".to_owned(), json!("select_department"))]))
    }

    async fn portal_doctors(&self, token: &str, department: &str) -> careline_backend::BackendResult<Vec<Doctor>> {
        let department_id = self
            .backend
            .portal_list_departments(token)
            .await?
            .into_iter()
            .find(|d| d.name.eq_ignore_ascii_case(department))
            .map(|d| d.id)
            .unwrap_or_default();
        self.backend.portal_list_doctors(token, &department_id).await
    }

    fn offer_doctors(&self, department: &str, doctors: &[Doctor]) -> WorkflowResult {
        let names: Vec<String> = doctors.iter().take(3).map(|d| format!("Dr. {} {}", d.first_name, d.last_name)).collect();
        let prompt = if names.is_empty() {
            "There are no doctors listed for that department right now. Would you like a different \
             department?"
                .to_owned()
        } else {
            format!("We have {} available. Who would you prefer?", names.join(", "))
        };
        WorkflowResult::reply(prompt).with_context(Entities::from([
            ("step".to_owned(), json!("select_doctor")),
            ("department".to_owned(), json!(department)),
            ("doctor_offered".to_owned(), json!(true)),
        ]))
    }

    fn match_doctor(&self, raw_text: &str, turn: &Entities, ctx: &WorkflowContext<'_>, doctors: &[Doctor]) -> Option<Doctor> {
        if let Some(name) = ctx.lookup_str(turn, "name") {
            if let Some(found) = find_doctor_by_name(doctors, name) {
                return Some(found);
            }
        }
        if let Some(found) = find_doctor_by_name(doctors, raw_text) {
            return Some(found);
        }
        if doctors.len() == 1 && is_affirmation(raw_text) {
            return Some(doctors[0].clone());
        }
        None
    }

    fn ask_for_date(&self, department: &str, doctor: &Doctor, error: &str) -> WorkflowResult {
        let prefix = if error.is_empty() { String::new() } else { format!("{error} ") };
        WorkflowResult::reply(format!("{prefix}What date would you like to come in?")).with_context(Entities::from([
            ("step".to_owned(), json!("need_date")),
            ("department".to_owned(), json!(department)),
            ("doctor_id".to_owned(), json!(doctor.id)),
            ("doctor_offered".to_owned(), json!(true)),
        ]))
    }

    fn ask_for_time(&self, department: &str, doctor: &Doctor, date: &str, slots: &[Slot]) -> WorkflowResult {
        let options: Vec<&str> = slots.iter().take(5).map(|s| s.time.as_str()).collect();
        let prompt = if options.is_empty() {
            format!("There are no open slots for Dr. {} {} on {date}. Would you like a different date?", doctor.first_name, doctor.last_name)
        } else {
            format!("Available times on {date}: {}. Which would you like?", options.join(", "))
        };
        WorkflowResult::reply(prompt).with_context(Entities::from([
            ("step".to_owned(), json!("select_time")),
            ("department".to_owned(), json!(department)),
            ("doctor_id".to_owned(), json!(doctor.id)),
            ("doctor_offered".to_owned(), json!(true)),
            ("preferred_date".to_owned(), json!(date)),
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
impl Workflow for PortalAppointmentWorkflow {
    fn supported_intents(&self) -> &'static [Intent] {
        SUPPORTED
    }

    async fn execute(&self, intent: Intent, turn_entities: &Entities, raw_text: &str, ctx: &WorkflowContext<'_>) -> WorkflowResult {
        let mut turn = turn_entities.clone();
        if matches!(intent, Intent::CheckAppointmentStatus | Intent::GeneralStatusInquiry) {
            turn.insert("status_inquiry".to_owned(), json!(true));
        }
        self.advance(&turn, ctx, raw_text).await
    }

    async fn continue_workflow(
        &self,
        _new_entities: &Entities,
        all_entities: &Entities,
        raw_text: &str,
        ctx: &WorkflowContext<'_>,
        is_confirmation: bool,
        _is_denial: bool,
    ) -> WorkflowResult {
        let mut entities = all_entities.clone();
        if is_confirmation {
            entities.insert("confirmed".to_owned(), json!(true));
        }
        self.advance(&entities, ctx, raw_text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use careline_backend::types::{Appointment, Department};
    use careline_test::FakeBackend;

    fn ctx<'a>(token: &'a str, collected: &'a Entities, state: &'a Entities) -> WorkflowContext<'a> {
        WorkflowContext {
            channel: "patient_portal",
            patient_token: Some(token),
            collected,
            workflow_state: state,
            turn_count: 1,
        }
    }

    fn backend() -> FakeBackend {
        FakeBackend::new()
            .with_departments(vec![Department { id: "D1".into(), name: "Cardiology".into() }])
            .with_doctors(vec![Doctor {
                id: "DOC9".into(),
                first_name: "Meera".into(),
                last_name: "Gupta".into(),
                department_id: Some("D1".into()),
            }])
            .with_slots(vec![Slot { time: "10:00".into(), available: true }])
            .with_created_appointment(Appointment {
                id: "A9".into(),
                appointment_number: Some("PAPT-9".into()),
                token_number: None,
                status: "booked".into(),
                date: "2026-08-02".into(),
                time: Some("10:00".into()),
                doctor_name: Some("Meera Gupta".into()),
                department: Some("Cardiology".into()),
            })
    }

    #[tokio::test]
    async fn without_token_returns_immediately() {
        let workflow = PortalAppointmentWorkflow::new(Arc::new(backend()));
        let collected = Entities::new();
        let state = Entities::new();
        let no_token = WorkflowContext {
            channel: "patient_portal",
            patient_token: None,
            collected: &collected,
            workflow_state: &state,
            turn_count: 1,
        };
        let result = workflow.advance(&Entities::new(), &no_token, "").await;
        assert!(result.is_complete);
    }

    #[tokio::test]
    async fn full_portal_flow_books_with_default_confirmation() {
        let workflow = PortalAppointmentWorkflow::new(Arc::new(backend()));

        let mut collected = Entities::new();
        let state = Entities::new();
        let r1 = workflow.advance(&Entities::new(), &ctx("tok", &collected, &state), "").await;
        assert!(r1.response_text.to_lowercase().contains("department"));

        collected.insert("department".into(), json!("Cardiology"));
        let r2 = workflow.advance(&Entities::new(), &ctx("tok", &collected, &state), "").await;
        assert!(r2.response_text.contains("Gupta"));

        let mut state3 = Entities::new();
        state3.insert("department".into(), json!("Cardiology"));
        state3.insert("doctor_offered".into(), json!(true));
        let r3 = workflow.advance(&Entities::new(), &ctx("tok", &collected, &state3), "Dr. Gupta").await;
        assert!(r3.response_text.to_lowercase().contains("date"));

        collected.insert("preferred_date".into(), json!("tomorrow"));
        let mut state4 = state3.clone();
        state4.insert("doctor_id".into(), json!("DOC9"));
        let r4 = workflow.advance(&Entities::new(), &ctx("tok", &collected, &state4), "Dr. Gupta").await;
        assert!(r4.response_text.contains("10:00"));

        collected.insert("time".into(), json!("10:00"));
        let r5 = workflow.advance(&Entities::new(), &ctx("tok", &collected, &state4), "yes please").await;
        assert!(r5.is_complete);
        assert!(r5.response_text.contains("PAPT-9"));
    }
}
