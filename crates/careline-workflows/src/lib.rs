//! The Workflow Engine and every workflow state machine for the Careline
//! voice receptionist orchestrator: intent dispatch, the shared
//! [`Workflow`] trait, the per-turn [`WorkflowContext`], and one module per
//! class of request (spec §4.7).

#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod appointment_booking;
pub mod appointment_portal;
pub mod bed;
pub mod context;
pub mod engine;
pub mod escalation;
pub mod lab;
pub mod opd_checkin;
pub mod patient_lookup;
pub mod raw_match;
pub mod registration;
pub mod status_inquiry;
pub mod workflow;

pub use context::WorkflowContext;
pub use engine::{greeting_text, EngineTurn, WorkflowEngine, CALLER_TOKEN_KEY};
pub use workflow::Workflow;
