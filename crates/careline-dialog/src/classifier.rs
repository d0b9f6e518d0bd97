//! Intent classification: the pluggable [`IntentClassifier`] trait, a
//! rule-based fallback that needs no external inference backend, and a thin
//! adapter for LLM-backed providers (spec §4.3).
//!
//! The specific LLM providers are out of scope for this crate (spec §1); an
//! inference backend is represented only by the minimal [`LlmBackend`]
//! trait, mirroring how the teacher separates a provider's transport from
//! its prompt/parse contract.

use async_trait::async_trait;
use careline_core::{Entities, IntentResult};
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

/// Converts free text (plus conversational context) into an [`IntentResult`].
///
/// Implementors never fail outright: on any internal error they return an
/// `UNCLEAR` result rather than propagating, since a dialog turn must always
/// produce *some* classification (spec §4.3).
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    /// Classify `text`, using `context` (e.g. `current_workflow`) only to
    /// enrich logging; the rule-based fallback does not consult it for
    /// routing decisions.
    async fn classify(&self, text: &str, context: &Entities) -> IntentResult;
}

/// The external inference backend an [`LlmClassifier`] prompts. Specific
/// providers (OpenAI, Gemini, OpenRouter, Ollama, ...) are out of scope;
/// callers supply whichever adapter speaks to their provider of choice.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Send `prompt` to the model and return its raw text response.
    ///
    /// # Errors
    ///
    /// Returns an error string (the human-readable failure) if the backend
    /// could not be reached or refused the request.
    async fn complete(&self, prompt: &str) -> Result<String, String>;
}

/// Wraps an [`LlmBackend`], parsing its JSON response into an
/// [`IntentResult`] and falling back to [`RuleBasedClassifier`] whenever the
/// backend is unreachable or its response cannot be parsed.
pub struct LlmClassifier<B> {
    backend: B,
    fallback: RuleBasedClassifier,
}

impl<B: LlmBackend> LlmClassifier<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            fallback: RuleBasedClassifier::new(),
        }
    }
}

#[async_trait]
impl<B: LlmBackend> IntentClassifier for LlmClassifier<B> {
    async fn classify(&self, text: &str, context: &Entities) -> IntentResult {
        let prompt = format!(
            "Classify the following caller utterance into a JSON object with \
             fields intent, confidence, entities, required_missing_fields.\n\n\
             Utterance: {text}"
        );
        match self.backend.complete(&prompt).await {
            Ok(response) => parse_llm_response(&response),
            Err(err) => {
                warn!(error = %err, "llm backend unavailable, using rule-based fallback");
                self.fallback.classify(text, context).await
            }
        }
    }
}

/// Extract a JSON object from `response`, tolerating a fenced ```json code
/// block, and parse it into an [`IntentResult`]. Any parse failure or empty
/// response yields `UNCLEAR` at confidence 0.3 (spec §4.3).
fn parse_llm_response(response: &str) -> IntentResult {
    static FENCE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)\s*```").expect("valid regex"));

    let json_str = FENCE
        .captures(response)
        .and_then(|caps| caps.get(1))
        .map_or(response, |m| m.as_str());

    let Ok(value) = serde_json::from_str::<serde_json::Value>(json_str) else {
        return IntentResult::unclear();
    };

    let intent = value
        .get("intent")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("UNCLEAR")
        .to_owned();
    let confidence = value
        .get("confidence")
        .and_then(serde_json::Value::as_f64)
        .map_or(0.5, |f| f as f32);
    let entities = value
        .get("entities")
        .and_then(|v| v.as_object())
        .map(|obj| obj.clone().into_iter().collect())
        .unwrap_or_default();
    let required_missing_fields = value
        .get("required_missing_fields")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_owned))
                .collect()
        })
        .unwrap_or_default();

    IntentResult {
        intent,
        confidence,
        entities,
        required_missing_fields,
    }
}

/// Rule-based keyword/regex cascade used whenever no LLM backend is
/// configured, or the LLM backend fails. Needs no network access and is
/// always available (spec §4.3).
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleBasedClassifier;

impl RuleBasedClassifier {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Synchronous entry point; the async [`IntentClassifier`] impl just
    /// forwards to this, since the cascade never suspends.
    #[must_use]
    pub fn classify_sync(&self, text: &str) -> IntentResult {
        let trimmed = text.trim();
        let lower = trimmed.to_lowercase();

        // 1. Emergency keywords.
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
        if EMERGENCY_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
            return IntentResult {
                intent: "REPORT_EMERGENCY".to_owned(),
                confidence: 0.9,
                entities: Entities::new(),
                required_missing_fields: Vec::new(),
            };
        }

        // 2. Human-escalation keywords.
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
        if HUMAN_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
            return simple("ESCALATE_TO_HUMAN", 0.8);
        }

        // 3. Greetings/goodbyes.
        const GREETING_KEYWORDS: &[&str] =
            &["hello", "hi", "good morning", "good afternoon", "good evening"];
        if GREETING_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
            return simple("GREETING", 0.8);
        }
        const GOODBYE_KEYWORDS: &[&str] = &["bye", "goodbye", "thank you", "thanks"];
        if GOODBYE_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
            return simple("GOODBYE", 0.8);
        }

        // 4. Status-query keywords, checked before action keywords.
        const STATUS_KEYWORDS: &[&str] = &["status", "result", "report", "check my", "where is"];
        if STATUS_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
            return simple("GENERAL_STATUS_INQUIRY", 0.7);
        }

        // 5. Action keywords.
        const BOOKING_KEYWORDS: &[&str] = &["book", "appointment", "schedule"];
        if BOOKING_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
            return simple("BOOK_APPOINTMENT", 0.7);
        }
        const REGISTER_KEYWORDS: &[&str] = &["register", "new patient"];
        if REGISTER_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
            return simple("REGISTER_PATIENT", 0.7);
        }
        const CHECKIN_KEYWORDS: &[&str] = &["check in", "arrived", "here for"];
        if CHECKIN_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
            return simple("OPD_CHECKIN", 0.7);
        }
        const BED_KEYWORDS: &[&str] = &["bed", "room", "admission"];
        if BED_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
            return simple("CHECK_BED_AVAILABILITY", 0.6);
        }
        const LAB_KEYWORDS: &[&str] = &["lab", "test", "blood"];
        if LAB_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
            return simple("BOOK_LAB_TEST", 0.6);
        }
        const BILL_KEYWORDS: &[&str] = &["bill", "payment", "owe"];
        if BILL_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
            return simple("CHECK_BILL_STATUS", 0.6);
        }

        // 6. Affirmations/denials.
        const YES_WORDS: &[&str] = &["yes", "yeah", "yep", "ok", "okay", "sure", "correct", "right"];
        if YES_WORDS.contains(&lower.as_str()) {
            return simple("CONFIRM_YES", 0.85);
        }
        const NO_WORDS: &[&str] = &["no", "nope", "cancel", "wrong", "incorrect"];
        if NO_WORDS.contains(&lower.as_str()) {
            return simple("CONFIRM_NO", 0.85);
        }

        // 7. Department names and aliases.
        if let Some(department) = crate::validator::match_department_alias(&lower) {
            return with_entity("PROVIDE_INFORMATION", 0.85, "department", department);
        }

        // 8. Date tokens.
        static DATE_RE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"\b\d{1,2}[-/.]\d{1,2}[-/.]\d{2,4}\b").expect("valid regex"));
        if let Some(m) = DATE_RE.find(trimmed) {
            let mut entities = Entities::new();
            entities.insert("date".to_owned(), serde_json::json!(m.as_str()));
            entities.insert("preferred_date".to_owned(), serde_json::json!(m.as_str()));
            return IntentResult {
                intent: "PROVIDE_INFORMATION".to_owned(),
                confidence: 0.85,
                entities,
                required_missing_fields: Vec::new(),
            };
        }
        const RELATIVE_DATE_WORDS: &[&str] = &["today", "tomorrow", "next week", "next monday"];
        if RELATIVE_DATE_WORDS.iter().any(|w| lower.contains(w)) {
            let mut entities = Entities::new();
            entities.insert("date".to_owned(), serde_json::json!(trimmed));
            entities.insert("preferred_date".to_owned(), serde_json::json!(trimmed));
            return IntentResult {
                intent: "PROVIDE_INFORMATION".to_owned(),
                confidence: 0.85,
                entities,
                required_missing_fields: Vec::new(),
            };
        }

        // 9. Time tokens.
        static TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"(?i)\b\d{1,2}:\d{2}(?:\s?[ap]m)?\b").expect("valid regex")
        });
        if let Some(m) = TIME_RE.find(trimmed) {
            let mut entities = Entities::new();
            entities.insert("time".to_owned(), serde_json::json!(m.as_str()));
            entities.insert("preferred_time".to_owned(), serde_json::json!(m.as_str()));
            return IntentResult {
                intent: "PROVIDE_INFORMATION".to_owned(),
                confidence: 0.85,
                entities,
                required_missing_fields: Vec::new(),
            };
        }

        // 10. A 10-digit phone after stripping spaces/dashes/dots.
        static STRIP_RE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"[\s\-.]").expect("valid regex"));
        static PHONE_RE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"\b(\d{10})\b").expect("valid regex"));
        let normalized = STRIP_RE.replace_all(trimmed, "").into_owned();
        if let Some(caps) = PHONE_RE.captures(&normalized) {
            return with_entity("PROVIDE_INFORMATION", 0.8, "phone", &caps[1]);
        }

        // 11. Short capitalized phrase, not common stopwords, -> name.
        const STOPWORDS: &[&str] = &[
            "i", "a", "the", "is", "my", "for", "to", "and", "or", "in", "on", "at",
        ];
        let words: Vec<&str> = trimmed.split_whitespace().collect();
        if !words.is_empty()
            && words.len() <= 3
            && words.iter().all(|w| {
                STOPWORDS.contains(&w.to_lowercase().as_str())
                    || w.chars().next().is_some_and(char::is_uppercase)
            })
        {
            return with_entity("PROVIDE_INFORMATION", 0.7, "name", trimmed);
        }

        // 12. Otherwise very short input -> value; else UNCLEAR.
        if !words.is_empty() && words.len() <= 3 {
            return with_entity("PROVIDE_INFORMATION", 0.5, "value", trimmed);
        }

        IntentResult::unclear()
    }
}

#[async_trait]
impl IntentClassifier for RuleBasedClassifier {
    async fn classify(&self, text: &str, _context: &Entities) -> IntentResult {
        self.classify_sync(text)
    }
}

fn simple(intent: &str, confidence: f32) -> IntentResult {
    IntentResult {
        intent: intent.to_owned(),
        confidence,
        entities: Entities::new(),
        required_missing_fields: Vec::new(),
    }
}

fn with_entity(intent: &str, confidence: f32, key: &str, value: &str) -> IntentResult {
    let mut entities = Entities::new();
    entities.insert(key.to_owned(), serde_json::json!(value));
    IntentResult {
        intent: intent.to_owned(),
        confidence,
        entities,
        required_missing_fields: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> IntentResult {
        RuleBasedClassifier::new().classify_sync(text)
    }

    #[test]
    fn emergency_keywords_win_over_everything() {
        let result = classify("I need a human, this is an emergency");
        assert_eq!(result.intent, "REPORT_EMERGENCY");
        assert!((result.confidence - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn human_escalation_detected() {
        assert_eq!(classify("let me speak to a manager").intent, "ESCALATE_TO_HUMAN");
    }

    #[test]
    fn status_keywords_beat_booking_keywords() {
        // "check my appointment" must not become BOOK_APPOINTMENT.
        assert_eq!(classify("check my appointment").intent, "GENERAL_STATUS_INQUIRY");
    }

    #[test]
    fn booking_keyword_without_status_words() {
        assert_eq!(classify("I want to book an appointment").intent, "BOOK_APPOINTMENT");
    }

    #[test]
    fn affirmation_is_confirm_yes() {
        assert_eq!(classify("yes").intent, "CONFIRM_YES");
    }

    #[test]
    fn denial_is_confirm_no() {
        assert_eq!(classify("nope").intent, "CONFIRM_NO");
    }

    #[test]
    fn department_alias_extracted() {
        let result = classify("cardio");
        assert_eq!(result.intent, "PROVIDE_INFORMATION");
        assert_eq!(result.entities.get("department").unwrap(), "Cardiology");
    }

    #[test]
    fn numeric_date_extracted() {
        let result = classify("15-03-2026");
        assert_eq!(result.intent, "PROVIDE_INFORMATION");
        assert_eq!(result.entities.get("date").unwrap(), "15-03-2026");
    }

    #[test]
    fn ten_digit_phone_extracted() {
        let result = classify("9876543210");
        assert_eq!(result.intent, "PROVIDE_INFORMATION");
        assert_eq!(result.entities.get("phone").unwrap(), "9876543210");
    }

    #[test]
    fn short_capitalized_name_extracted() {
        let result = classify("Ravi Kumar");
        assert_eq!(result.intent, "PROVIDE_INFORMATION");
        assert_eq!(result.entities.get("name").unwrap(), "Ravi Kumar");
    }

    #[test]
    fn long_unrecognized_text_is_unclear() {
        let result = classify("I would like to know more about your facility hours please");
        assert_eq!(result.intent, "UNCLEAR");
    }

    #[test]
    fn llm_response_parses_fenced_json() {
        let response = "```json\n{\"intent\": \"BOOK_APPOINTMENT\", \"confidence\": 0.95, \"entities\": {\"department\": \"Cardiology\"}, \"required_missing_fields\": []}\n```";
        let result = parse_llm_response(response);
        assert_eq!(result.intent, "BOOK_APPOINTMENT");
        assert!((result.confidence - 0.95).abs() < f32::EPSILON);
    }

    #[test]
    fn malformed_llm_response_is_unclear() {
        let result = parse_llm_response("not json at all");
        assert_eq!(result.intent, "UNCLEAR");
        assert!((result.confidence - 0.3).abs() < f32::EPSILON);
    }
}
