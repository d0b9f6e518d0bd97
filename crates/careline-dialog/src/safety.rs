//! Safety guardrails: confidence gating, emergency/escalation detection, PII
//! masking, and auto-escalation triggers (spec §4.5).

use std::collections::BTreeMap;
use std::sync::LazyLock;

use careline_core::Entities;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

/// Confidence level bands (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
    VeryLow,
}

const HIGH_THRESHOLD: f32 = 0.85;
const MEDIUM_THRESHOLD: f32 = 0.65;
const LOW_THRESHOLD: f32 = 0.40;

/// Maximum turns before auto-escalation, absent an explicit config override.
pub const MAX_TURNS_BEFORE_ESCALATION: u32 = 15;
/// Maximum cumulative failed-intent turns before auto-escalation.
pub const MAX_INTENT_FAILURES: u32 = 3;

/// The action a safety check recommends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyAction {
    Allow,
    Confirm,
    Clarify,
    Escalate,
    Block,
}

/// Result of [`SafetyGuardrails::get_safe_response`].
#[derive(Debug, Clone)]
pub struct SafetyResponse {
    pub action: SafetyAction,
    pub message: Option<String>,
    pub intent_override: Option<String>,
    pub log_text: String,
}

/// Per-intent confidence threshold overrides (spec §4.5); intents not
/// listed fall back to the medium band threshold.
fn intent_threshold(intent: &str, overrides: &BTreeMap<String, f32>) -> f32 {
    overrides.get(intent).copied().unwrap_or(MEDIUM_THRESHOLD)
}

/// Stateless safety checks over raw text, confidence, and conversation
/// context.
#[derive(Debug, Default, Clone, Copy)]
pub struct SafetyGuardrails;

impl SafetyGuardrails {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    #[must_use]
    pub fn confidence_level(&self, confidence: f32) -> ConfidenceLevel {
        if confidence >= HIGH_THRESHOLD {
            ConfidenceLevel::High
        } else if confidence >= MEDIUM_THRESHOLD {
            ConfidenceLevel::Medium
        } else if confidence >= LOW_THRESHOLD {
            ConfidenceLevel::Low
        } else {
            ConfidenceLevel::VeryLow
        }
    }

    /// Compute the confidence gate's action and message for `intent`.
    #[must_use]
    pub fn check_intent_confidence(
        &self,
        intent: &str,
        confidence: f32,
        intent_thresholds: &BTreeMap<String, f32>,
    ) -> (SafetyAction, Option<String>) {
        let threshold = intent_threshold(intent, intent_thresholds);
        match self.confidence_level(confidence) {
            ConfidenceLevel::High => (SafetyAction::Allow, None),
            ConfidenceLevel::Medium => {
                if confidence >= threshold {
                    (SafetyAction::Allow, None)
                } else {
                    (
                        SafetyAction::Confirm,
                        Some(format!(
                            "Just to confirm, did you want to {}?",
                            intent_to_action(intent)
                        )),
                    )
                }
            }
            ConfidenceLevel::Low => (
                SafetyAction::Clarify,
                Some("I'm not quite sure I understood. Could you please tell me again what you'd like to do?".to_owned()),
            ),
            ConfidenceLevel::VeryLow => (
                SafetyAction::Clarify,
                Some("I'm sorry, I didn't catch that. Could you please repeat?".to_owned()),
            ),
        }
    }

    /// Whether `text` mentions an emergency keyword (spec §4.5 step 1).
    #[must_use]
    pub fn check_for_emergency(&self, text: &str) -> bool {
        const EMERGENCY_KEYWORDS: &[&str] = &[
            "emergency",
            "urgent",
            "accident",
            "heart attack",
            "stroke",
            "bleeding",
            "unconscious",
            "chest pain",
            "breathing problem",
            "seizure",
            "collapse",
            "dying",
            "critical",
            "ambulance",
        ];
        let lower = text.to_lowercase();
        let hit = EMERGENCY_KEYWORDS.iter().any(|kw| lower.contains(kw));
        if hit {
            warn!("emergency keyword detected in caller utterance");
        }
        hit
    }

    /// Whether `text` asks for a human (spec §4.5 step 2). Uses the spec's
    /// exact keyword list, not the Python original's slightly different one.
    #[must_use]
    pub fn check_for_human_escalation(&self, text: &str) -> bool {
        const HUMAN_KEYWORDS: &[&str] = &[
            "human",
            "person",
            "real person",
            "transfer",
            "operator",
            "receptionist",
            "manager",
            "talk to human",
            "not working",
            "stupid bot",
        ];
        let lower = text.to_lowercase();
        HUMAN_KEYWORDS.iter().any(|kw| lower.contains(kw))
    }

    /// Mask sensitive spans in `text` for safe logging (spec §4.5 step 5).
    /// Order matters: the 12-digit Aadhaar pattern is masked before the
    /// narrower phone pattern would otherwise misfire on part of it.
    #[must_use]
    pub fn mask_sensitive_data(&self, text: &str) -> String {
        static AADHAAR: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"\b(\d{4})[\s-]?(\d{4})[\s-]?(\d{4})\b").expect("valid regex")
        });
        static CARD: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"\b(\d{4})[\s-]?(\d{4})[\s-]?(\d{4})[\s-]?(\d{4})\b").expect("valid regex")
        });
        static PHONE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"\b(\d{6})(\d{4})\b").expect("valid regex"));

        let masked = AADHAAR.replace_all(text, "XXXX-XXXX-$3");
        let masked = PHONE.replace_all(&masked, "XXXXXX$2");
        let masked = CARD.replace_all(&masked, "XXXX-XXXX-XXXX-$4");
        masked.into_owned()
    }

    /// Whether sensitive data (password/CVV mentions) was detected, to log
    /// but never store.
    #[must_use]
    pub fn check_sensitive_data(&self, text: &str) -> Vec<&'static str> {
        static PASSWORD: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"(?i)\b(password|pwd|pin)[\s:]+\S+").expect("valid regex"));
        static CVV: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"(?i)\bcvv[\s:]?\d{3,4}\b").expect("valid regex"));

        let mut detected = Vec::new();
        if PASSWORD.is_match(text) {
            detected.push("password");
        }
        if CVV.is_match(text) {
            detected.push("cvv");
        }
        detected
    }

    /// Auto-escalation trigger: too many turns, or too many consecutive
    /// failed-intent turns (spec §4.5 step 4).
    #[must_use]
    pub fn should_escalate(&self, turn_count: u32, failed_intents: u32) -> Option<&'static str> {
        if turn_count >= MAX_TURNS_BEFORE_ESCALATION {
            return Some("long_conversation");
        }
        if failed_intents >= MAX_INTENT_FAILURES {
            return Some("repeated_failures");
        }
        None
    }

    /// The central safety check for one classified turn (spec §4.5).
    #[must_use]
    pub fn get_safe_response(
        &self,
        intent: &str,
        confidence: f32,
        raw_text: &str,
        turn_count: u32,
        failed_intents: u32,
        intent_thresholds: &BTreeMap<String, f32>,
    ) -> SafetyResponse {
        let log_text = self.mask_sensitive_data(raw_text);

        if self.check_for_emergency(raw_text) {
            return SafetyResponse {
                action: SafetyAction::Escalate,
                message: None,
                intent_override: Some("REPORT_EMERGENCY".to_owned()),
                log_text,
            };
        }

        if self.check_for_human_escalation(raw_text) {
            return SafetyResponse {
                action: SafetyAction::Escalate,
                message: None,
                intent_override: Some("ESCALATE_TO_HUMAN".to_owned()),
                log_text,
            };
        }

        let (action, message) = self.check_intent_confidence(intent, confidence, intent_thresholds);
        if action != SafetyAction::Allow {
            return SafetyResponse {
                action,
                message,
                intent_override: None,
                log_text,
            };
        }

        if self.should_escalate(turn_count, failed_intents).is_some() {
            return SafetyResponse {
                action: SafetyAction::Escalate,
                message: Some(
                    "I've been trying to help but it seems complex. Let me connect you with a human receptionist who can assist you better.".to_owned(),
                ),
                intent_override: None,
                log_text,
            };
        }

        SafetyResponse {
            action: SafetyAction::Allow,
            message: None,
            intent_override: None,
            log_text,
        }
    }

    /// Final pre-execution gate (spec §4.5): cancellations without an
    /// appointment id and no confirmation must confirm first; patient
    /// creation missing required fields after confirmation must clarify.
    #[must_use]
    pub fn validate_before_action(
        &self,
        intent: &str,
        entities: &Entities,
        confirmed: bool,
    ) -> (SafetyAction, Option<String>) {
        if intent == "CANCEL_APPOINTMENT"
            && !is_truthy(entities.get("appointment_id"))
            && !confirmed
        {
            return (
                SafetyAction::Confirm,
                Some("I want to make sure I cancel the right appointment. Could you confirm the appointment details?".to_owned()),
            );
        }

        if intent == "REGISTER_PATIENT" && confirmed {
            let missing: Vec<&str> = ["first_name", "last_name", "phone"]
                .into_iter()
                .filter(|f| !is_truthy(entities.get(*f)))
                .collect();
            if !missing.is_empty() {
                return (
                    SafetyAction::Clarify,
                    Some(format!("I still need your {} to complete registration.", missing.join(", "))),
                );
            }
        }

        (SafetyAction::Allow, None)
    }
}

fn is_truthy(value: Option<&Value>) -> bool {
    value.is_some_and(careline_core::entities::is_truthy)
}

fn intent_to_action(intent: &str) -> &'static str {
    match intent {
        "REGISTER_PATIENT" => "register as a new patient",
        "FIND_PATIENT" => "look up your patient record",
        "BOOK_APPOINTMENT" => "book an appointment",
        "RESCHEDULE_APPOINTMENT" => "reschedule your appointment",
        "CANCEL_APPOINTMENT" => "cancel your appointment",
        "OPD_CHECKIN" => "check in for your appointment",
        "CHECK_BED_AVAILABILITY" => "check bed availability",
        "REQUEST_BED_ALLOCATION" => "request a bed",
        "BOOK_LAB_TEST" => "book a lab test",
        "CHECK_LAB_STATUS" => "check your lab results",
        "CHECK_BILL_STATUS" => "check your bill status",
        _ => "proceed with that",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> BTreeMap<String, f32> {
        [
            ("REGISTER_PATIENT", 0.80),
            ("BOOK_APPOINTMENT", 0.75),
            ("REPORT_EMERGENCY", 0.50),
            ("REQUEST_BED_ALLOCATION", 0.80),
            ("CANCEL_APPOINTMENT", 0.85),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v))
        .collect()
    }

    #[test]
    fn emergency_scan_overrides_everything_including_low_confidence() {
        let guardrails = SafetyGuardrails::new();
        let response = guardrails.get_safe_response(
            "UNCLEAR",
            0.1,
            "there's been an accident, send an ambulance",
            0,
            0,
            &thresholds(),
        );
        assert_eq!(response.action, SafetyAction::Escalate);
        assert_eq!(response.intent_override.as_deref(), Some("REPORT_EMERGENCY"));
        assert!(response.message.is_none());
    }

    #[test]
    fn human_escalation_overrides_confidence_gate() {
        let guardrails = SafetyGuardrails::new();
        let response = guardrails.get_safe_response(
            "BOOK_APPOINTMENT",
            0.95,
            "I want to talk to a manager",
            0,
            0,
            &thresholds(),
        );
        assert_eq!(response.action, SafetyAction::Escalate);
        assert_eq!(response.intent_override.as_deref(), Some("ESCALATE_TO_HUMAN"));
    }

    #[test]
    fn medium_band_below_intent_threshold_asks_to_confirm() {
        let guardrails = SafetyGuardrails::new();
        let (action, message) = guardrails.check_intent_confidence("BOOK_APPOINTMENT", 0.70, &thresholds());
        assert_eq!(action, SafetyAction::Confirm);
        assert!(message.unwrap().contains("book an appointment"));
    }

    #[test]
    fn medium_band_default_threshold_allows() {
        let guardrails = SafetyGuardrails::new();
        let (action, _) = guardrails.check_intent_confidence("GREETING", 0.70, &thresholds());
        assert_eq!(action, SafetyAction::Allow);
    }

    #[test]
    fn very_low_confidence_asks_to_repeat() {
        let guardrails = SafetyGuardrails::new();
        let (action, message) = guardrails.check_intent_confidence("GREETING", 0.1, &thresholds());
        assert_eq!(action, SafetyAction::Clarify);
        assert!(message.unwrap().contains("didn't catch"));
    }

    #[test]
    fn auto_escalates_after_turn_limit() {
        let guardrails = SafetyGuardrails::new();
        assert_eq!(guardrails.should_escalate(15, 0), Some("long_conversation"));
    }

    #[test]
    fn auto_escalates_after_repeated_failures() {
        let guardrails = SafetyGuardrails::new();
        assert_eq!(guardrails.should_escalate(1, 3), Some("repeated_failures"));
    }

    #[test]
    fn masks_aadhaar_keeping_last_group() {
        let guardrails = SafetyGuardrails::new();
        assert_eq!(guardrails.mask_sensitive_data("my id is 1234 5678 9012"), "my id is XXXX-XXXX-9012");
    }

    #[test]
    fn masks_ten_digit_phone_keeping_last_four() {
        let guardrails = SafetyGuardrails::new();
        assert_eq!(guardrails.mask_sensitive_data("call 9876543210 now"), "call XXXXXX3210 now");
    }

    #[test]
    fn cancel_without_id_or_confirmation_requires_confirm() {
        let guardrails = SafetyGuardrails::new();
        let (action, _) = guardrails.validate_before_action("CANCEL_APPOINTMENT", &Entities::new(), false);
        assert_eq!(action, SafetyAction::Confirm);
    }

    #[test]
    fn register_missing_fields_after_confirmation_clarifies() {
        let guardrails = SafetyGuardrails::new();
        let mut entities = Entities::new();
        entities.insert("first_name".to_owned(), serde_json::json!("Ravi"));
        let (action, message) = guardrails.validate_before_action("REGISTER_PATIENT", &entities, true);
        assert_eq!(action, SafetyAction::Clarify);
        assert!(message.unwrap().contains("last_name"));
    }
}
