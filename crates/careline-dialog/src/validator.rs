//! Entity validation and normalization (spec §4.4).
//!
//! Each validator returns a [`ValidationOutcome`] (re-exported from
//! `careline-core`) plus, in [`ValidatedEntity`], the original value for
//! logging. `validate_all` dispatches every known key and passes unknown
//! keys through untouched.

use std::sync::LazyLock;

use careline_core::{Entities, ValidationOutcome};
use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use regex::Regex;
use serde_json::Value;

/// A validated entity: the original value alongside its validation outcome.
#[derive(Debug, Clone)]
pub struct ValidatedEntity {
    pub original: Value,
    pub outcome: ValidationOutcome,
}

/// Closed department alias map, checked by substring (spec §4.4).
const DEPARTMENT_ALIASES: &[(&str, &str)] = &[
    ("heart", "Cardiology"),
    ("cardio", "Cardiology"),
    ("cardiac", "Cardiology"),
    ("ortho", "Orthopedics"),
    ("bone", "Orthopedics"),
    ("bones", "Orthopedics"),
    ("fracture", "Orthopedics"),
    ("general", "General Medicine"),
    ("medicine", "General Medicine"),
    ("fever", "General Medicine"),
    ("cold", "General Medicine"),
    ("ent", "ENT"),
    ("ear", "ENT"),
    ("nose", "ENT"),
    ("throat", "ENT"),
    ("eye", "Ophthalmology"),
    ("eyes", "Ophthalmology"),
    ("skin", "Dermatology"),
    ("derma", "Dermatology"),
    ("neuro", "Neurology"),
    ("brain", "Neurology"),
    ("nerve", "Neurology"),
    ("child", "Pediatrics"),
    ("children", "Pediatrics"),
    ("kids", "Pediatrics"),
    ("baby", "Pediatrics"),
    ("gynec", "Gynecology"),
    ("women", "Gynecology"),
    ("pregnancy", "Gynecology"),
    ("dental", "Dentistry"),
    ("teeth", "Dentistry"),
    ("tooth", "Dentistry"),
];

const STANDARD_DEPARTMENTS: &[&str] = &[
    "General Medicine",
    "Cardiology",
    "Orthopedics",
    "ENT",
    "Ophthalmology",
    "Dermatology",
    "Neurology",
    "Pediatrics",
    "Gynecology",
    "Dentistry",
    "Psychiatry",
    "Urology",
];

/// Match `lower` (already lowercased) against the alias map, returning the
/// canonical department name. Used both by the Entity Validator and the
/// rule-based classifier's department detection (spec §4.3 step 7).
#[must_use]
pub fn match_department_alias(lower: &str) -> Option<&'static str> {
    DEPARTMENT_ALIASES
        .iter()
        .find(|(alias, _)| lower.contains(alias))
        .map(|(_, canonical)| *canonical)
}

/// Stateless entity validators, one method per entity kind, plus a bulk
/// `validate_all` dispatcher (spec §4.4).
#[derive(Debug, Default, Clone, Copy)]
pub struct EntityValidator;

impl EntityValidator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Validate a phone number: strip separators, match the four accepted
    /// patterns, normalize to exactly 10 digits.
    #[must_use]
    pub fn validate_phone(&self, phone: &str) -> ValidationOutcome {
        static STRIP: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"[\s\-()+]").expect("valid regex"));
        if phone.is_empty() {
            return ValidationOutcome::Invalid {
                error: "Phone number is required".to_owned(),
            };
        }
        let cleaned = STRIP.replace_all(phone, "").into_owned();

        let normalized = if cleaned.len() == 12 && cleaned.starts_with("91") && is_valid_mobile(&cleaned[2..]) {
            Some(cleaned[2..].to_owned())
        } else if cleaned.len() == 11 && cleaned.starts_with('0') && is_valid_mobile(&cleaned[1..]) {
            Some(cleaned[1..].to_owned())
        } else if cleaned.len() == 10 && is_valid_mobile(&cleaned) {
            Some(cleaned)
        } else {
            None
        };

        normalized.map_or_else(
            || ValidationOutcome::Invalid {
                error: "Please provide a valid 10-digit mobile number".to_owned(),
            },
            |normalized| ValidationOutcome::Valid { normalized },
        )
    }

    /// Validate and normalize a date string to ISO `YYYY-MM-DD`.
    #[must_use]
    pub fn validate_date(&self, date_str: &str, allow_past: bool, max_future_days: i64) -> ValidationOutcome {
        if date_str.is_empty() {
            return ValidationOutcome::Invalid {
                error: "Date is required".to_owned(),
            };
        }
        let lower = date_str.trim().to_lowercase();
        let today = Utc::now().date_naive();

        const RELATIVE: &[(&str, i64)] = &[("day after tomorrow", 2), ("tomorrow", 1), ("next week", 7), ("today", 0)];
        for (keyword, offset) in RELATIVE {
            if lower.contains(keyword) {
                let target = today + Duration::days(*offset);
                return ValidationOutcome::Valid {
                    normalized: target.format("%Y-%m-%d").to_string(),
                };
            }
        }

        const DAY_NAMES: &[(&str, Weekday)] = &[
            ("monday", Weekday::Mon),
            ("tuesday", Weekday::Tue),
            ("wednesday", Weekday::Wed),
            ("thursday", Weekday::Thu),
            ("friday", Weekday::Fri),
            ("saturday", Weekday::Sat),
            ("sunday", Weekday::Sun),
        ];
        for (name, weekday) in DAY_NAMES {
            if lower.contains(name) {
                let today_num = today.weekday().num_days_from_monday() as i64;
                let target_num = weekday.num_days_from_monday() as i64;
                let mut days_ahead = target_num - today_num;
                if days_ahead <= 0 {
                    days_ahead += 7;
                }
                let target = today + Duration::days(days_ahead);
                return ValidationOutcome::Valid {
                    normalized: target.format("%Y-%m-%d").to_string(),
                };
            }
        }

        const FORMATS: &[&str] = &[
            "%Y-%m-%d",
            "%d-%m-%Y",
            "%d/%m/%Y",
            "%d %b %Y",
            "%d %B %Y",
            "%B %d, %Y",
            "%d-%m-%y",
            "%d/%m/%y",
        ];
        for fmt in FORMATS {
            if let Ok(parsed) = NaiveDate::parse_from_str(&lower, fmt) {
                if !allow_past && parsed < today {
                    return ValidationOutcome::Invalid {
                        error: "Date cannot be in the past".to_owned(),
                    };
                }
                if max_future_days > 0 && (parsed - today).num_days() > max_future_days {
                    return ValidationOutcome::Invalid {
                        error: format!("Date cannot be more than {max_future_days} days in the future"),
                    };
                }
                return ValidationOutcome::Valid {
                    normalized: parsed.format("%Y-%m-%d").to_string(),
                };
            }
        }

        ValidationOutcome::Invalid {
            error: "Could not understand the date. Please say it as day, month, year".to_owned(),
        }
    }

    #[must_use]
    pub fn validate_gender(&self, gender: &str) -> ValidationOutcome {
        if gender.is_empty() {
            return ValidationOutcome::Invalid {
                error: "Gender is required".to_owned(),
            };
        }
        let lower = gender.trim().to_lowercase();
        match lower.as_str() {
            "male" | "m" | "man" | "boy" => ValidationOutcome::Valid {
                normalized: "Male".to_owned(),
            },
            "female" | "f" | "woman" | "girl" => ValidationOutcome::Valid {
                normalized: "Female".to_owned(),
            },
            "other" | "o" => ValidationOutcome::Valid {
                normalized: "Other".to_owned(),
            },
            _ => ValidationOutcome::Invalid {
                error: "Please specify Male, Female, or Other".to_owned(),
            },
        }
    }

    #[must_use]
    pub fn validate_name(&self, name: &str) -> ValidationOutcome {
        static ALLOWED: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"^[A-Za-z\s.\-']+$").expect("valid regex"));
        if name.is_empty() {
            return ValidationOutcome::Invalid {
                error: "Name is required".to_owned(),
            };
        }
        let cleaned = title_case(&name.split_whitespace().collect::<Vec<_>>().join(" "));
        if cleaned.chars().count() < 2 {
            return ValidationOutcome::Invalid {
                error: "Name seems too short".to_owned(),
            };
        }
        if !ALLOWED.is_match(&cleaned) {
            return ValidationOutcome::NeedsConfirmation { normalized: cleaned };
        }
        ValidationOutcome::Valid { normalized: cleaned }
    }

    #[must_use]
    pub fn validate_department(&self, department: &str) -> ValidationOutcome {
        if department.is_empty() {
            return ValidationOutcome::Invalid {
                error: "Department is required".to_owned(),
            };
        }
        let lower = department.trim().to_lowercase();

        if let Some(canonical) = match_department_alias(&lower) {
            return ValidationOutcome::Valid {
                normalized: canonical.to_owned(),
            };
        }

        for dept in STANDARD_DEPARTMENTS {
            let dept_lower = dept.to_lowercase();
            if dept_lower.contains(&lower) || lower.contains(&dept_lower) {
                return ValidationOutcome::Valid {
                    normalized: (*dept).to_owned(),
                };
            }
        }

        ValidationOutcome::NeedsConfirmation {
            normalized: title_case(department),
        }
    }

    #[must_use]
    pub fn validate_patient_id(&self, patient_id: &str) -> ValidationOutcome {
        static HIS: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"^HIS-\d{4}-\d{3,6}$").expect("valid regex"));
        static P_FORM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^P\d{6,10}$").expect("valid regex"));
        static UHID: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"^[A-Z]{2,4}\d{6,10}$").expect("valid regex"));

        if patient_id.is_empty() {
            return ValidationOutcome::Invalid {
                error: "Patient ID is required".to_owned(),
            };
        }
        let cleaned = patient_id.trim().to_uppercase();

        if HIS.is_match(&cleaned) || P_FORM.is_match(&cleaned) || UHID.is_match(&cleaned) {
            return ValidationOutcome::Valid { normalized: cleaned };
        }
        if !cleaned.is_empty() && cleaned.chars().all(|c| c.is_ascii_digit()) && (4..=12).contains(&cleaned.len()) {
            return ValidationOutcome::Valid { normalized: cleaned };
        }

        ValidationOutcome::NeedsConfirmation { normalized: cleaned }
    }

    /// Dispatch every known key in `entities` to its validator; unknown
    /// keys pass through untouched (not included in the result map).
    #[must_use]
    pub fn validate_all(&self, entities: &Entities) -> std::collections::BTreeMap<String, ValidatedEntity> {
        let mut results = std::collections::BTreeMap::new();
        for (key, value) in entities {
            let Some(text) = value.as_str() else { continue };
            if text.is_empty() {
                continue;
            }
            let outcome = match key.as_str() {
                "phone" => self.validate_phone(text),
                "date_of_birth" => self.validate_date(text, true, 0),
                "preferred_date" => self.validate_date(text, false, 90),
                "gender" => self.validate_gender(text),
                "first_name" | "last_name" => self.validate_name(text),
                "department" => self.validate_department(text),
                "patient_id" => self.validate_patient_id(text),
                _ => continue,
            };
            results.insert(
                key.clone(),
                ValidatedEntity {
                    original: value.clone(),
                    outcome,
                },
            );
        }
        results
    }
}

fn is_valid_mobile(digits: &str) -> bool {
    digits.len() == 10
        && digits
            .chars()
            .next()
            .is_some_and(|c| ('6'..='9').contains(&c))
        && digits.chars().all(|c| c.is_ascii_digit())
}

fn title_case(input: &str) -> String {
    input
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_with_country_code_normalizes_to_ten_digits() {
        let outcome = EntityValidator::new().validate_phone("+91 98765 43210");
        assert_eq!(
            outcome,
            ValidationOutcome::Valid {
                normalized: "9876543210".to_owned()
            }
        );
    }

    #[test]
    fn phone_with_leading_zero_normalizes() {
        let outcome = EntityValidator::new().validate_phone("09876543210");
        assert_eq!(
            outcome,
            ValidationOutcome::Valid {
                normalized: "9876543210".to_owned()
            }
        );
    }

    #[test]
    fn phone_not_starting_six_to_nine_is_invalid() {
        let outcome = EntityValidator::new().validate_phone("1234567890");
        assert!(!outcome.is_valid());
    }

    #[test]
    fn relative_date_tomorrow_resolves() {
        let outcome = EntityValidator::new().validate_date("tomorrow", false, 90);
        let expected = (Utc::now().date_naive() + Duration::days(1))
            .format("%Y-%m-%d")
            .to_string();
        assert_eq!(
            outcome,
            ValidationOutcome::Valid { normalized: expected }
        );
    }

    #[test]
    fn weekday_today_maps_to_next_week_not_today() {
        let today_name = Utc::now().date_naive().weekday();
        let name = match today_name {
            Weekday::Mon => "monday",
            Weekday::Tue => "tuesday",
            Weekday::Wed => "wednesday",
            Weekday::Thu => "thursday",
            Weekday::Fri => "friday",
            Weekday::Sat => "saturday",
            Weekday::Sun => "sunday",
        };
        let outcome = EntityValidator::new().validate_date(name, false, 90);
        let expected = (Utc::now().date_naive() + Duration::days(7))
            .format("%Y-%m-%d")
            .to_string();
        assert_eq!(
            outcome,
            ValidationOutcome::Valid { normalized: expected }
        );
    }

    #[test]
    fn gender_synonym_normalizes() {
        assert_eq!(
            EntityValidator::new().validate_gender("girl"),
            ValidationOutcome::Valid {
                normalized: "Female".to_owned()
            }
        );
    }

    #[test]
    fn name_is_title_cased() {
        assert_eq!(
            EntityValidator::new().validate_name("  ravi   kumar "),
            ValidationOutcome::Valid {
                normalized: "Ravi Kumar".to_owned()
            }
        );
    }

    #[test]
    fn name_too_short_is_invalid() {
        assert!(!EntityValidator::new().validate_name("R").is_valid());
    }

    #[test]
    fn department_alias_resolves() {
        assert_eq!(
            EntityValidator::new().validate_department("heart"),
            ValidationOutcome::Valid {
                normalized: "Cardiology".to_owned()
            }
        );
    }

    #[test]
    fn unknown_department_needs_confirmation() {
        let outcome = EntityValidator::new().validate_department("radiology");
        assert!(matches!(outcome, ValidationOutcome::NeedsConfirmation { .. }));
    }

    #[test]
    fn his_style_patient_id_is_valid() {
        assert_eq!(
            EntityValidator::new().validate_patient_id("his-2024-0001"),
            ValidationOutcome::Valid {
                normalized: "HIS-2024-0001".to_owned()
            }
        );
    }

    #[test]
    fn validate_all_skips_unknown_keys() {
        let mut entities = Entities::new();
        entities.insert("phone".to_owned(), serde_json::json!("9876543210"));
        entities.insert("nickname".to_owned(), serde_json::json!("Robbie"));
        let results = EntityValidator::new().validate_all(&entities);
        assert!(results.contains_key("phone"));
        assert!(!results.contains_key("nickname"));
    }
}
