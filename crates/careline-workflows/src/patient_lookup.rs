//! The patient-resolution pattern repeated across almost every workflow:
//! prefer a directly supplied `patient_id`, otherwise search by `phone`
//! (spec §4.7: "Patient resolution: from patient_id or phone search").

use careline_backend::types::Patient;
use careline_backend::{BackendClient, BackendResult};
use careline_core::Entities;

use crate::context::WorkflowContext;

/// Outcome of resolving a patient identifier from the three-tier entity
/// lookup.
pub enum PatientLookup {
    /// A single patient id, either supplied directly or the unique result
    /// of a phone search.
    Resolved(String),
    /// A phone search ran and found nobody.
    NotFound,
    /// A phone search found more than one matching patient.
    Ambiguous(Vec<Patient>),
    /// Neither `patient_id` nor `phone` is present anywhere in the
    /// three-tier lookup.
    MissingIdentifier,
}

/// Resolve a patient id from `patient_id` or `phone`, searching the backend
/// only when a phone number (not an id) is all that is available.
pub async fn resolve_patient_id(
    backend: &dyn BackendClient,
    turn: &Entities,
    ctx: &WorkflowContext<'_>,
) -> BackendResult<PatientLookup> {
    if let Some(patient_id) = ctx.lookup_str(turn, "patient_id") {
        return Ok(PatientLookup::Resolved(patient_id.to_owned()));
    }
    if let Some(phone) = ctx.lookup_str(turn, "phone") {
        let matches = backend.search_patients(phone).await?;
        return Ok(match matches.len() {
            0 => PatientLookup::NotFound,
            1 => PatientLookup::Resolved(matches[0].id.clone()),
            _ => PatientLookup::Ambiguous(matches),
        });
    }
    Ok(PatientLookup::MissingIdentifier)
}
