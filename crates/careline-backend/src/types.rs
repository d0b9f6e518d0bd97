//! Typed payloads exchanged with the hospital backend.

use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// A registered patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
}

/// A hospital department.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
}

/// A doctor within a department.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub department_id: Option<String>,
}

/// One open booking slot for a doctor on a given day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub time: String,
    #[serde(default = "default_true")]
    pub available: bool,
}

/// An OPD appointment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub appointment_number: Option<String>,
    #[serde(default)]
    pub token_number: Option<String>,
    pub status: String,
    pub date: String,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub doctor_name: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
}

/// A request to create an OPD appointment against the service account.
#[derive(Debug, Clone, Serialize)]
pub struct CreateAppointmentRequest {
    pub patient: String,
    pub department: String,
    #[serde(rename = "scheduledDate")]
    pub scheduled_date: String,
    #[serde(rename = "type")]
    pub appointment_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "chiefComplaint")]
    pub chief_complaint: Option<String>,
}

/// A request to book an appointment via the patient-portal namespace.
#[derive(Debug, Clone, Serialize)]
pub struct PortalBookingRequest {
    #[serde(rename = "doctorId")]
    pub doctor_id: String,
    #[serde(rename = "departmentId")]
    pub department_id: String,
    pub date: String,
    pub time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Aggregated bed availability by type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BedAvailability {
    #[serde(default)]
    pub general: u32,
    #[serde(default)]
    pub private: u32,
    #[serde(default)]
    pub icu: u32,
}

/// One bed record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bed {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(rename = "bedType", alias = "bed_type")]
    pub bed_type: String,
    pub status: String,
}

/// A request to allocate a specific bed to a patient.
#[derive(Debug, Clone, Serialize)]
pub struct AllocateBedRequest {
    #[serde(rename = "patientId")]
    pub patient_id: String,
    #[serde(rename = "bedType")]
    pub bed_type: String,
}

/// An IPD admission request (never created directly by this orchestrator;
/// always routed to a human).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionRequest {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub status: String,
}

/// An emergency case created on the caller's behalf.
#[derive(Debug, Clone, Serialize)]
pub struct CreateEmergencyCaseRequest {
    #[serde(rename = "patientName")]
    pub patient_name: String,
    #[serde(rename = "chiefComplaint")]
    pub chief_complaint: String,
    #[serde(rename = "triageLevel")]
    pub triage_level: String,
    pub source: String,
}

/// One entry in the emergency queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyCase {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub status: String,
}

/// A catalog lab test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabTest {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
}

/// One ordered lab test for a patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabOrder {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub test_name: Option<String>,
}

/// One patient bill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bill {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub status: String,
    #[serde(rename = "totalAmount")]
    pub total_amount: f64,
    #[serde(rename = "paidAmount", default)]
    pub paid_amount: f64,
}

/// Response shape from `POST /auth/login`: the token may be named
/// `accessToken` or `token` depending on deployment.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

impl LoginResponse {
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        self.access_token
            .as_deref()
            .or(self.token.as_deref())
    }
}

/// The service-account credentials posted to `/auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Queue depth as reported by `GET /opd/queue`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueStatus {
    #[serde(default)]
    pub length: u32,
}
