//! Matching a caller's raw utterance against fixed word lists, used where a
//! workflow step needs to read intent straight from the transcript rather
//! than the classifier (spec §4.7: doctor-name confirmation, the portal
//! appointment workflow's affirmation/denial detection).

const AFFIRMATIONS: &[&str] = &[
    "yes", "yeah", "yep", "sure", "ok", "okay", "confirm", "book", "please", "do it", "go ahead",
];

const DENIALS: &[&str] = &["no", "nope", "cancel", "stop", "don't", "dont", "not now"];

/// Whether `raw` (verbatim caller utterance) reads as an affirmation,
/// matched as whole words or short fixed phrases, case-insensitively.
#[must_use]
pub fn is_affirmation(raw: &str) -> bool {
    let lower = raw.trim().to_lowercase();
    AFFIRMATIONS.iter().any(|word| word_matches(&lower, word))
}

/// Whether `raw` reads as a denial.
#[must_use]
pub fn is_denial(raw: &str) -> bool {
    let lower = raw.trim().to_lowercase();
    DENIALS.iter().any(|word| word_matches(&lower, word))
}

fn word_matches(lower: &str, phrase: &str) -> bool {
    if phrase.contains(' ') {
        lower.contains(phrase)
    } else {
        lower.split_whitespace().any(|w| w.trim_matches(|c: char| !c.is_alphanumeric()) == phrase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_plain_yes() {
        assert!(is_affirmation("yes"));
        assert!(is_affirmation("Yeah sure"));
    }

    #[test]
    fn recognizes_go_ahead_phrase() {
        assert!(is_affirmation("okay go ahead with it"));
    }

    #[test]
    fn recognizes_plain_no() {
        assert!(is_denial("no"));
        assert!(is_denial("Nope, cancel that"));
    }

    #[test]
    fn unrelated_text_matches_neither() {
        assert!(!is_affirmation("my phone is 9876543210"));
        assert!(!is_denial("my phone is 9876543210"));
    }
}
