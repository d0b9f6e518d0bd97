//! Patient registration and patient lookup (spec §4.7 "Patient
//! Registration"). One workflow instance answers both `REGISTER_PATIENT`
//! and `FIND_PATIENT`, matching the Python original's single
//! `PatientRegistrationWorkflow` class.

use std::sync::Arc;

use async_trait::async_trait;
use careline_backend::BackendClient;
use careline_core::{Entities, Intent, ValidationOutcome, WorkflowResult};
use careline_dialog::EntityValidator;
use serde_json::json;
use tracing::{error, info};

use crate::context::WorkflowContext;
use crate::workflow::Workflow;

const REQUIRED_FIELDS: &[(&str, &str)] = &[
    ("first_name", "What is the patient's first name?"),
    ("last_name", "What is the patient's last name?"),
    ("phone", "What is the patient's phone number?"),
    ("date_of_birth", "What is the patient's date of birth?"),
    ("gender", "Is the patient Male, Female, or Other?"),
];

const SUPPORTED: &[Intent] = &[Intent::RegisterPatient, Intent::FindPatient, Intent::UpdatePatient];

pub struct PatientRegistrationWorkflow {
    backend: Arc<dyn BackendClient>,
    validator: EntityValidator,
}

impl PatientRegistrationWorkflow {
    #[must_use]
    pub fn new(backend: Arc<dyn BackendClient>) -> Self {
        Self {
            backend,
            validator: EntityValidator::new(),
        }
    }

    async fn register_patient(&self, turn: &Entities, ctx: &WorkflowContext<'_>) -> WorkflowResult {
        for (field, prompt) in REQUIRED_FIELDS {
            if !ctx.lookup_truthy(turn, field) {
                return WorkflowResult::reply(*prompt)
                    .with_context(Entities::from([("step".to_owned(), json!("collecting_info"))]));
            }
        }

        let phone_raw = ctx.lookup_str(turn, "phone").unwrap_or_default();
        let phone = match self.validator.validate_phone(phone_raw) {
            ValidationOutcome::Valid { normalized } => normalized,
            ValidationOutcome::Invalid { error } | ValidationOutcome::NeedsConfirmation { error: _, .. } => {
                return WorkflowResult::reply(format!("{error} Could you repeat the phone number?"))
                    .with_context(Entities::from([("step".to_owned(), json!("collecting_info"))]));
            }
        };

        let dob_raw = ctx.lookup_str(turn, "date_of_birth").unwrap_or_default();
        let date_of_birth = match self.validator.validate_date(dob_raw, true, 0) {
            ValidationOutcome::Valid { normalized } => normalized,
            _ => {
                return WorkflowResult::reply(
                    "I couldn't understand that date of birth. Could you say it as day, month, year?",
                )
                .with_context(Entities::from([("step".to_owned(), json!("collecting_info"))]));
            }
        };

        let gender_raw = ctx.lookup_str(turn, "gender").unwrap_or_default();
        let gender = match self.validator.validate_gender(gender_raw) {
            ValidationOutcome::Valid { normalized } => normalized,
            ValidationOutcome::Invalid { error } => {
                return WorkflowResult::reply(format!("{error} Is the patient Male, Female, or Other?"))
                    .with_context(Entities::from([("step".to_owned(), json!("collecting_info"))]));
            }
            ValidationOutcome::NeedsConfirmation { normalized } => normalized,
        };

        let first_name = ctx.lookup_str(turn, "first_name").unwrap_or_default().to_owned();
        let last_name = ctx.lookup_str(turn, "last_name").unwrap_or_default().to_owned();
        let confirmed = ctx.lookup_truthy(turn, "confirmed");

        if !confirmed {
            let summary = format!(
                "Let me confirm: {first_name} {last_name}, phone {phone}, date of birth {date_of_birth}, \
                 gender {gender}. Shall I go ahead and register this patient?"
            );
            return WorkflowResult::reply(summary)
                .with_context(Entities::from([("step".to_owned(), json!("awaiting_confirmation"))]));
        }

        let payload = json!({
            "firstName": first_name,
            "lastName": last_name,
            "phone": phone,
            "dateOfBirth": date_of_birth,
            "gender": gender,
        });
        match self.backend.create_patient(&payload).await {
            Ok(patient) => WorkflowResult::reply(format!(
                "Thank you. {first_name} has been registered with patient ID {}.",
                patient.id
            ))
            .complete(),
            Err(e) => {
                error!(error = %e, "create_patient failed");
                WorkflowResult::reply(
                    "I'm having trouble registering the patient right now. Let me connect you with our front desk.",
                )
                .requires_human()
                .complete()
            }
        }
    }

    async fn find_patient(&self, turn: &Entities, ctx: &WorkflowContext<'_>) -> WorkflowResult {
        let patient_id = ctx.lookup_str(turn, "patient_id");
        let phone = ctx.lookup_str(turn, "phone");
        let name = ctx.lookup_str(turn, "first_name").or_else(|| ctx.lookup_str(turn, "name"));

        if patient_id.is_none() && phone.is_none() && name.is_none() {
            return WorkflowResult::reply(
                "Could you give me the patient's ID or phone number so I can look them up?",
            )
            .with_context(Entities::from([("step".to_owned(), json!("need_identifier"))]));
        }

        if let Some(id) = patient_id {
            return match self.backend.get_patient(id).await {
                Ok(patient) => WorkflowResult::reply(format!(
                    "I found {} {}, phone {}.",
                    patient.first_name, patient.last_name, patient.phone
                ))
                .complete(),
                Err(_) => self.no_patient_found(),
            };
        }

        let query = phone.or(name).unwrap_or_default();
        match self.backend.search_patients(query).await {
            Ok(matches) if matches.is_empty() => self.no_patient_found(),
            Ok(matches) if matches.len() == 1 => {
                let patient = &matches[0];
                WorkflowResult::reply(format!(
                    "I found {} {}, phone {}.",
                    patient.first_name, patient.last_name, patient.phone
                ))
                .complete()
            }
            Ok(matches) => {
                let names: Vec<String> = matches
                    .iter()
                    .take(3)
                    .map(|p| format!("{} {}", p.first_name, p.last_name))
                    .collect();
                WorkflowResult::reply(format!(
                    "I found a few matching patients: {}. Could you tell me which one, or share their \
                     patient ID?",
                    names.join(", ")
                ))
                .with_context(Entities::from([("step".to_owned(), json!("disambiguate_patient"))]))
            }
            Err(e) => {
                error!(error = %e, "search_patients failed");
                WorkflowResult::reply("I'm having trouble searching for that patient right now.")
                    .requires_human()
                    .complete()
            }
        }
    }

    fn no_patient_found(&self) -> WorkflowResult {
        WorkflowResult::reply(
            "I couldn't find a patient with those details. Would you like to register as a new patient?",
        )
        .with_context(Entities::from([("step".to_owned(), json!("offer_registration"))]))
    }
}

#[async_trait]
impl Workflow for PatientRegistrationWorkflow {
    fn supported_intents(&self) -> &'static [Intent] {
        SUPPORTED
    }

    async fn execute(
        &self,
        intent: Intent,
        turn_entities: &Entities,
        _raw_text: &str,
        ctx: &WorkflowContext<'_>,
    ) -> WorkflowResult {
        match intent {
            Intent::FindPatient => self.find_patient(turn_entities, ctx).await,
            Intent::RegisterPatient => self.register_patient(turn_entities, ctx).await,
            _ => {
                info!(intent = %intent, "patient registration workflow has no handler for this intent");
                WorkflowResult::reply(
                    "I'm not sure how to help with that patient request. Would you like to register a \
                     new patient or look one up?",
                )
            }
        }
    }

    async fn continue_workflow(
        &self,
        _new_entities: &Entities,
        all_entities: &Entities,
        _raw_text: &str,
        ctx: &WorkflowContext<'_>,
        is_confirmation: bool,
        is_denial: bool,
    ) -> WorkflowResult {
        let step = ctx
            .workflow_state
            .get("step")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();

        match step {
            "awaiting_confirmation" if is_confirmation => {
                let mut confirmed = all_entities.clone();
                confirmed.insert("confirmed".to_owned(), json!(true));
                self.register_patient(&confirmed, ctx).await
            }
            "awaiting_confirmation" if is_denial => WorkflowResult::reply(
                "No problem, let's go through it again. What is the patient's first name?",
            )
            .with_context(Entities::from([("step".to_owned(), json!("collecting_info"))])),
            "offer_registration" if is_confirmation => {
                WorkflowResult::reply("Let's get you registered. What is your first name?")
                    .with_context(Entities::from([("step".to_owned(), json!("collecting_info"))]))
            }
            "disambiguate_patient" | "need_identifier" => self.find_patient(all_entities, ctx).await,
            _ => self.register_patient(all_entities, ctx).await,
        }
    }
}
