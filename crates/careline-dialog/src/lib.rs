//! Intent classification, entity validation, and safety guardrails for the
//! Careline voice receptionist orchestrator.
//!
//! This crate has no opinion on sessions or workflows; it exposes the
//! pluggable [`IntentClassifier`] trait plus a rule-based fallback
//! implementation, a stateless [`validator`] module, and the
//! [`SafetyGuardrails`] central safety checks (spec §4.3-§4.5).

#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod classifier;
pub mod safety;
pub mod validator;

pub use classifier::{IntentClassifier, RuleBasedClassifier};
pub use safety::{ConfidenceLevel, SafetyAction, SafetyGuardrails, SafetyResponse};
pub use validator::{EntityValidator, ValidatedEntity};
