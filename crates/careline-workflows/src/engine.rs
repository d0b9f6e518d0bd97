//! The Workflow Engine: classifies a turn, runs it past the safety
//! guardrails, dispatches to the active or newly started workflow, and
//! commits the result back onto the session (spec §4.7, §9 "the engine
//! holds a map from intent to interface value").

use std::collections::BTreeMap;
use std::sync::Arc;

use careline_backend::BackendClient;
use careline_config::OrchestratorConfig;
use careline_core::entities::merge_entities;
use careline_core::{Entities, ErrorKind, Intent, OrchestratorError, OrchestratorResult, Turn};
use careline_dialog::safety::SafetyAction;
use careline_dialog::{IntentClassifier, SafetyGuardrails};
use careline_session::Session;
use chrono::{Timelike, Utc};
use tracing::{debug, info};

use crate::appointment_booking::AppointmentBookingWorkflow;
use crate::appointment_portal::PortalAppointmentWorkflow;
use crate::bed::BedWorkflow;
use crate::context::WorkflowContext;
use crate::escalation::EscalationWorkflow;
use crate::lab::LabBookingWorkflow;
use crate::opd_checkin::OpdCheckinWorkflow;
use crate::registration::PatientRegistrationWorkflow;
use crate::status_inquiry::StatusInquiryWorkflow;
use crate::workflow::Workflow;

/// Key under which the patient-portal caller's bearer token lives in
/// `session.entities` (spec §9 open question: `Session` has no dedicated
/// token field, so the gateway populates this entity like any other when it
/// starts a `patient_portal` session, and every workflow reads it back out
/// through [`WorkflowContext::patient_token`]).
pub const CALLER_TOKEN_KEY: &str = "caller_token";

/// The outcome of one dialog turn, ready to cross the HTTP boundary.
#[derive(Debug, Clone)]
pub struct EngineTurn {
    pub intent: String,
    pub response_text: String,
    pub context: Entities,
    pub is_complete: bool,
    pub requires_human: bool,
}

/// Every workflow instance the engine can dispatch to, named so a session
/// can record which one is currently active independent of the intent
/// that (re-)entered it (spec §9: several intents share one `Arc<dyn
/// Workflow>`).
struct Workflows {
    patient_registration: Arc<dyn Workflow>,
    appointment_booking: Arc<dyn Workflow>,
    appointment_portal: Arc<dyn Workflow>,
    opd_checkin: Arc<dyn Workflow>,
    bed: Arc<dyn Workflow>,
    lab_booking: Arc<dyn Workflow>,
    status_inquiry: Arc<dyn Workflow>,
    escalation: Arc<dyn Workflow>,
}

impl Workflows {
    fn by_name(&self, name: &str) -> Option<Arc<dyn Workflow>> {
        Some(match name {
            "patient_registration" => Arc::clone(&self.patient_registration),
            "appointment_booking" => Arc::clone(&self.appointment_booking),
            "appointment_portal" => Arc::clone(&self.appointment_portal),
            "opd_checkin" => Arc::clone(&self.opd_checkin),
            "bed" => Arc::clone(&self.bed),
            "lab_booking" => Arc::clone(&self.lab_booking),
            "status_inquiry" => Arc::clone(&self.status_inquiry),
            "escalation" => Arc::clone(&self.escalation),
            _ => return None,
        })
    }

    /// The stable name a freshly classified `intent` starts under, outside
    /// of patient-portal takeover routing.
    fn name_for_intent(&self, intent: Intent) -> Option<&'static str> {
        match intent {
            Intent::RegisterPatient | Intent::FindPatient | Intent::UpdatePatient => Some("patient_registration"),
            Intent::BookAppointment | Intent::RescheduleAppointment | Intent::CancelAppointment => Some("appointment_booking"),
            Intent::CheckAppointmentStatus | Intent::GeneralStatusInquiry | Intent::CheckLabStatus | Intent::CheckBillStatus => {
                Some("status_inquiry")
            }
            Intent::OpdCheckin | Intent::OpdQueueStatus => Some("opd_checkin"),
            Intent::RequestAdmission | Intent::CheckBedAvailability | Intent::RequestBedAllocation => Some("bed"),
            Intent::BookLabTest => Some("lab_booking"),
            Intent::ReportEmergency | Intent::EscalateToHuman => Some("escalation"),
            Intent::Greeting | Intent::Goodbye | Intent::Help | Intent::Unclear | Intent::ConfirmYes | Intent::ConfirmNo | Intent::ProvideInformation => {
                None
            }
        }
    }
}

/// Intents routed to the patient-portal appointment workflow instead of
/// their usual service-account workflow whenever the session is on the
/// `patient_portal` channel with a caller token present (spec §4.7).
fn is_portal_appointment_intent(intent: Intent) -> bool {
    matches!(
        intent,
        Intent::BookAppointment
            | Intent::RescheduleAppointment
            | Intent::CancelAppointment
            | Intent::CheckAppointmentStatus
            | Intent::GeneralStatusInquiry
    )
}

/// Classifies, safety-checks, dispatches, and commits every dialog turn.
pub struct WorkflowEngine {
    classifier: Arc<dyn IntentClassifier>,
    safety: SafetyGuardrails,
    intent_thresholds: BTreeMap<String, f32>,
    max_turns: u32,
    workflows: Workflows,
}

impl WorkflowEngine {
    #[must_use]
    pub fn new(classifier: Arc<dyn IntentClassifier>, backend: Arc<dyn BackendClient>, config: &OrchestratorConfig) -> Self {
        Self {
            classifier,
            safety: SafetyGuardrails::new(),
            intent_thresholds: config.safety.intent_thresholds.clone(),
            max_turns: config.session.max_turns,
            workflows: Workflows {
                patient_registration: Arc::new(PatientRegistrationWorkflow::new(Arc::clone(&backend))),
                appointment_booking: Arc::new(AppointmentBookingWorkflow::new(Arc::clone(&backend))),
                appointment_portal: Arc::new(PortalAppointmentWorkflow::new(Arc::clone(&backend))),
                opd_checkin: Arc::new(OpdCheckinWorkflow::new(Arc::clone(&backend))),
                bed: Arc::new(BedWorkflow::new(Arc::clone(&backend))),
                lab_booking: Arc::new(LabBookingWorkflow::new(Arc::clone(&backend))),
                status_inquiry: Arc::new(StatusInquiryWorkflow::new(Arc::clone(&backend))),
                escalation: Arc::new(EscalationWorkflow::new(backend)),
            },
        }
    }

    /// Run one dialog turn for `session`, mutating it in place with the
    /// merged entities, workflow state, and appended turn.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] with [`ErrorKind::SessionFull`] without
    /// touching `session` if the turn limit was already reached (spec §8
    /// invariant 2), so a rejected turn never partially mutates the
    /// session it was rejected for.
    pub async fn process_turn(&self, session: &mut Session, raw_text: &str) -> OrchestratorResult<EngineTurn> {
        if session.turn_count() >= self.max_turns as usize {
            session.active = false;
            return Err(OrchestratorError::new(
                ErrorKind::SessionFull,
                format!("session {} has reached its {}-turn limit", session.id, self.max_turns),
            ));
        }

        let classified = self.classifier.classify(raw_text, &session.entities).await;
        let turn_index = u32::try_from(session.turn_count()).unwrap_or(u32::MAX);

        let safety = self.safety.get_safe_response(
            &classified.intent,
            classified.confidence,
            raw_text,
            turn_index,
            session.failed_intent_count,
            &self.intent_thresholds,
        );

        let resolved = match safety.action {
            SafetyAction::Escalate => match &safety.intent_override {
                Some(overridden) => {
                    let turn = self.route(session, overridden, &classified.entities, raw_text).await;
                    session.mark_intent_advanced();
                    turn
                }
                None => EngineTurn {
                    intent: classified.intent.clone(),
                    response_text: safety
                        .message
                        .unwrap_or_else(|| "Let me connect you with a member of our team.".to_owned()),
                    context: Entities::new(),
                    is_complete: true,
                    requires_human: true,
                },
            },
            SafetyAction::Confirm => EngineTurn {
                intent: classified.intent.clone(),
                response_text: safety.message.unwrap_or_default(),
                context: Entities::new(),
                is_complete: false,
                requires_human: false,
            },
            SafetyAction::Clarify | SafetyAction::Block => {
                session.mark_intent_failed();
                EngineTurn {
                    intent: classified.intent.clone(),
                    response_text: safety.message.unwrap_or_default(),
                    context: Entities::new(),
                    is_complete: false,
                    requires_human: false,
                }
            }
            SafetyAction::Allow => {
                let turn = self.route(session, &classified.intent, &classified.entities, raw_text).await;
                session.mark_intent_advanced();
                turn
            }
        };

        if resolved.is_complete {
            session.clear_workflow();
        }

        let turn = Turn {
            index: turn_index.saturating_add(1),
            timestamp: Utc::now(),
            raw_input: raw_text.to_owned(),
            intent: resolved.intent.clone(),
            entities: classified.entities,
            response_text: resolved.response_text.clone(),
            calls: Vec::new(),
        };
        session
            .append_turn(turn, self.max_turns)
            .map_err(|e| OrchestratorError::new(ErrorKind::SessionFull, e.to_string()))?;

        Ok(resolved)
    }

    /// Decide whether `intent_name` starts a fresh workflow, continues the
    /// active one, or is handled inline (greeting/goodbye/help/unclear),
    /// then runs it.
    async fn route(&self, session: &mut Session, intent_name: &str, turn_entities: &Entities, raw_text: &str) -> EngineTurn {
        let Some(intent) = Intent::parse(intent_name) else {
            return self.unclear();
        };

        if let Some(simple) = self.handle_simple_intent(intent) {
            return simple;
        }

        let caller_token = session.entities.get(CALLER_TOKEN_KEY).and_then(|v| v.as_str()).map(ToOwned::to_owned);
        let is_portal = session.channel == "patient_portal" && caller_token.is_some();

        if is_portal && is_portal_appointment_intent(intent) {
            return self.run_workflow("appointment_portal", session, intent, turn_entities, raw_text, true).await;
        }

        if let Some(active_name) = session.current_workflow.clone() {
            let reenters_active = intent.is_confirmation_family()
                || intent == Intent::Unclear
                || self.workflows.name_for_intent(intent) == Some(active_name.as_str());
            if reenters_active {
                return self.run_workflow(&active_name, session, intent, turn_entities, raw_text, true).await;
            }
        } else if intent == Intent::Unclear {
            return self.unclear();
        }

        match self.workflows.name_for_intent(intent) {
            Some(name) => self.run_workflow(name, session, intent, turn_entities, raw_text, false).await,
            None => self.unclear(),
        }
    }

    async fn run_workflow(
        &self,
        name: &str,
        session: &mut Session,
        intent: Intent,
        turn_entities: &Entities,
        raw_text: &str,
        continuing: bool,
    ) -> EngineTurn {
        let Some(workflow) = self.workflows.by_name(name) else {
            return self.unclear();
        };

        let patient_token = session.entities.get(CALLER_TOKEN_KEY).and_then(|v| v.as_str()).map(ToOwned::to_owned);
        let ctx = WorkflowContext {
            channel: &session.channel,
            patient_token: patient_token.as_deref(),
            collected: &session.entities,
            workflow_state: &session.workflow_state,
            turn_count: u32::try_from(session.turn_count()).unwrap_or(u32::MAX),
        };

        let result = if continuing {
            let is_confirmation = intent == Intent::ConfirmYes || crate::raw_match::is_affirmation(raw_text);
            let is_denial = intent == Intent::ConfirmNo || crate::raw_match::is_denial(raw_text);
            let mut all_entities = session.entities.clone();
            merge_entities(&mut all_entities, turn_entities);
            workflow
                .continue_workflow(turn_entities, &all_entities, raw_text, &ctx, is_confirmation, is_denial)
                .await
        } else {
            session.set_workflow(name, Entities::new());
            workflow.execute(intent, turn_entities, raw_text, &ctx).await
        };

        debug!(workflow = name, intent = %intent, is_complete = result.is_complete, "workflow result");

        session.merge_entities(turn_entities);
        session.update_workflow_state(&result.updated_context);

        EngineTurn {
            intent: intent.as_str().to_owned(),
            response_text: result.response_text,
            context: session.entities.clone(),
            is_complete: result.is_complete,
            requires_human: result.requires_human,
        }
    }

    fn handle_simple_intent(&self, intent: Intent) -> Option<EngineTurn> {
        let response_text = match intent {
            Intent::Greeting => greeting_text(),
            Intent::Goodbye => "Thank you for calling. Take care!".to_owned(),
            Intent::Help => {
                "I can help you register as a patient, book or check in for an appointment, check bed \
                 availability, book a lab test, or check your lab, bill, or appointment status. What would \
                 you like to do?"
                    .to_owned()
            }
            _ => return None,
        };
        info!(intent = %intent, "handled simple intent directly");
        Some(EngineTurn {
            intent: intent.as_str().to_owned(),
            response_text,
            context: Entities::new(),
            is_complete: true,
            requires_human: false,
        })
    }

    fn unclear(&self) -> EngineTurn {
        EngineTurn {
            intent: Intent::Unclear.as_str().to_owned(),
            response_text: "I'm not sure I understood. Could you tell me what you'd like to do?".to_owned(),
            context: Entities::new(),
            is_complete: false,
            requires_human: false,
        }
    }
}

/// Morning before noon, afternoon before 5pm, evening otherwise (spec §4.7).
fn time_of_day_greeting() -> &'static str {
    let hour = Utc::now().hour();
    if hour < 12 {
        "Good morning"
    } else if hour < 17 {
        "Good afternoon"
    } else {
        "Good evening"
    }
}

/// The time-of-day greeting spoken by `POST /voice/call` on session start,
/// shared with [`WorkflowEngine::handle_simple_intent`]'s `GREETING` branch
/// so both entry points vary identically by wall-clock hour.
#[must_use]
pub fn greeting_text() -> String {
    format!("{}! How can I help you today?", time_of_day_greeting())
}

#[cfg(test)]
mod tests {
    use super::*;
    use careline_dialog::RuleBasedClassifier;
    use careline_session::SessionStore;
    use careline_test::FakeBackend;

    fn engine(backend: FakeBackend) -> WorkflowEngine {
        let classifier: Arc<dyn IntentClassifier> = Arc::new(RuleBasedClassifier::new());
        let backend: Arc<dyn BackendClient> = Arc::new(backend);
        WorkflowEngine::new(classifier, backend, &OrchestratorConfig::default())
    }

    #[tokio::test]
    async fn greeting_completes_immediately_without_starting_a_workflow() {
        let engine = engine(FakeBackend::new());
        let store = SessionStore::new(300, 20);
        let id = store.create("caller-1", "phone");
        let handle = store.handle(&id).await.unwrap();
        let mut session = handle.lock().await;
        let turn = engine.process_turn(&mut session, "hello there").await.unwrap();
        assert!(turn.is_complete);
        assert!(session.current_workflow.is_none());
    }

    #[tokio::test]
    async fn emergency_keyword_overrides_classification_and_escalates() {
        let engine = engine(FakeBackend::new());
        let store = SessionStore::new(300, 20);
        let id = store.create("caller-1", "phone");
        let handle = store.handle(&id).await.unwrap();
        let mut session = handle.lock().await;
        let turn = engine.process_turn(&mut session, "there's an accident, send an ambulance").await.unwrap();
        assert!(turn.requires_human);
        assert!(turn.response_text.to_lowercase().contains("emergency"));
    }

    #[tokio::test]
    async fn unclear_intent_with_no_active_workflow_asks_for_clarification() {
        let engine = engine(FakeBackend::new());
        let store = SessionStore::new(300, 20);
        let id = store.create("caller-1", "phone");
        let handle = store.handle(&id).await.unwrap();
        let mut session = handle.lock().await;
        let turn = engine
            .process_turn(&mut session, "I would like to know more about your facility hours please")
            .await
            .unwrap();
        assert!(!turn.is_complete);
        assert!(!turn.requires_human);
    }

    #[tokio::test]
    async fn session_at_turn_limit_is_rejected_without_mutation() {
        let engine = engine(FakeBackend::new());
        let store = SessionStore::new(300, 1);
        let id = store.create("caller-1", "phone");
        let handle = store.handle(&id).await.unwrap();
        let mut session = handle.lock().await;
        engine.process_turn(&mut session, "hello").await.unwrap();
        let err = engine.process_turn(&mut session, "hello again").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::SessionFull);
        assert_eq!(session.turn_count(), 1);
    }

    #[tokio::test]
    async fn bed_availability_completes_in_one_turn() {
        use careline_backend::types::BedAvailability;
        let engine = engine(FakeBackend::new().with_bed_availability(BedAvailability { general: 2, private: 1, icu: 0 }));
        let store = SessionStore::new(300, 20);
        let id = store.create("caller-1", "phone");
        let handle = store.handle(&id).await.unwrap();
        let mut session = handle.lock().await;
        let turn = engine.process_turn(&mut session, "are there any beds available").await.unwrap();
        assert!(turn.is_complete);
        assert!(turn.response_text.contains("ICU"));
    }
}
