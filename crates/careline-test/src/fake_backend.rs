//! An in-memory [`BackendClient`] fake: canned responses configured with
//! `with_*` builders, optional per-operation failure injection, and a call
//! log workflow tests can assert against instead of making a real HTTP call.

use std::collections::BTreeSet;
use std::sync::Mutex;

use async_trait::async_trait;
use careline_backend::types::{
    AdmissionRequest, AllocateBedRequest, Appointment, Bed, BedAvailability, Bill,
    CreateAppointmentRequest, CreateEmergencyCaseRequest, Department, Doctor, EmergencyCase,
    LabOrder, LabTest, Patient, PortalBookingRequest, QueueStatus, Slot,
};
use careline_backend::{BackendClient, BackendError, BackendResult};
use careline_core::Entities;

/// A canned, inspectable stand-in for the hospital backend.
///
/// Build one with [`FakeBackend::new`] and the `with_*` methods, then wrap
/// it in an `Arc` to hand to a workflow under test. `calls()` returns the
/// operation names invoked, in order, so a test can assert a workflow made
/// (or deliberately did not make) a particular call.
pub struct FakeBackend {
    patients: Vec<Patient>,
    departments: Vec<Department>,
    doctors: Vec<Doctor>,
    slots: Vec<Slot>,
    appointments: Vec<Appointment>,
    created_appointment: Option<Appointment>,
    queue: QueueStatus,
    bed_availability: BedAvailability,
    beds: Vec<Bed>,
    admission_requests: Vec<AdmissionRequest>,
    emergency_queue: Vec<EmergencyCase>,
    lab_tests: Vec<LabTest>,
    lab_orders: Vec<LabOrder>,
    bills: Vec<Bill>,
    failing: BTreeSet<&'static str>,
    calls: Mutex<Vec<String>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            patients: Vec::new(),
            departments: Vec::new(),
            doctors: Vec::new(),
            slots: Vec::new(),
            appointments: Vec::new(),
            created_appointment: None,
            queue: QueueStatus::default(),
            bed_availability: BedAvailability::default(),
            beds: Vec::new(),
            admission_requests: Vec::new(),
            emergency_queue: Vec::new(),
            lab_tests: Vec::new(),
            lab_orders: Vec::new(),
            bills: Vec::new(),
            failing: BTreeSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_patients(mut self, patients: Vec<Patient>) -> Self {
        self.patients = patients;
        self
    }

    #[must_use]
    pub fn with_departments(mut self, departments: Vec<Department>) -> Self {
        self.departments = departments;
        self
    }

    #[must_use]
    pub fn with_doctors(mut self, doctors: Vec<Doctor>) -> Self {
        self.doctors = doctors;
        self
    }

    #[must_use]
    pub fn with_slots(mut self, slots: Vec<Slot>) -> Self {
        self.slots = slots;
        self
    }

    #[must_use]
    pub fn with_appointments(mut self, appointments: Vec<Appointment>) -> Self {
        self.appointments = appointments;
        self
    }

    #[must_use]
    pub fn with_created_appointment(mut self, appointment: Appointment) -> Self {
        self.created_appointment = Some(appointment);
        self
    }

    #[must_use]
    pub fn with_queue(mut self, queue: QueueStatus) -> Self {
        self.queue = queue;
        self
    }

    #[must_use]
    pub fn with_bed_availability(mut self, availability: BedAvailability) -> Self {
        self.bed_availability = availability;
        self
    }

    #[must_use]
    pub fn with_beds(mut self, beds: Vec<Bed>) -> Self {
        self.beds = beds;
        self
    }

    #[must_use]
    pub fn with_lab_tests(mut self, tests: Vec<LabTest>) -> Self {
        self.lab_tests = tests;
        self
    }

    #[must_use]
    pub fn with_lab_orders(mut self, orders: Vec<LabOrder>) -> Self {
        self.lab_orders = orders;
        self
    }

    #[must_use]
    pub fn with_bills(mut self, bills: Vec<Bill>) -> Self {
        self.bills = bills;
        self
    }

    /// Make `operation` return [`BackendError::Server`] instead of its
    /// canned response. `operation` is the method name, e.g.
    /// `"create_emergency_case"`.
    #[must_use]
    pub fn with_failure(mut self, operation: &'static str) -> Self {
        self.failing.insert(operation);
        self
    }

    /// The operation names invoked so far, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("lock poisoned").clone()
    }

    fn record(&self, operation: &'static str) -> BackendResult<()> {
        self.calls.lock().expect("lock poisoned").push(operation.to_owned());
        if self.failing.contains(operation) {
            return Err(BackendError::Server {
                endpoint: operation.to_owned(),
                status: 500,
                message: "injected failure".to_owned(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl BackendClient for FakeBackend {
    async fn search_patients(&self, query: &str) -> BackendResult<Vec<Patient>> {
        self.record("search_patients")?;
        Ok(self
            .patients
            .iter()
            .filter(|p| p.phone.contains(query) || p.first_name.contains(query) || p.last_name.contains(query))
            .cloned()
            .collect())
    }

    async fn get_patient(&self, patient_id: &str) -> BackendResult<Patient> {
        self.record("get_patient")?;
        self.patients
            .iter()
            .find(|p| p.id == patient_id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound { endpoint: "/patients".into() })
    }

    async fn create_patient(&self, patient: &serde_json::Value) -> BackendResult<Patient> {
        self.record("create_patient")?;
        Ok(Patient {
            id: "P000111".into(),
            first_name: patient.get("firstName").and_then(|v| v.as_str()).unwrap_or("Ravi").to_owned(),
            last_name: patient.get("lastName").and_then(|v| v.as_str()).unwrap_or("Kumar").to_owned(),
            phone: patient.get("phone").and_then(|v| v.as_str()).unwrap_or("9876543210").to_owned(),
            date_of_birth: None,
            gender: None,
        })
    }

    async fn list_departments(&self) -> BackendResult<Vec<Department>> {
        self.record("list_departments")?;
        Ok(self.departments.clone())
    }

    async fn list_doctors(&self, _department_id: &str) -> BackendResult<Vec<Doctor>> {
        self.record("list_doctors")?;
        Ok(self.doctors.clone())
    }

    async fn create_appointment(&self, _request: &CreateAppointmentRequest) -> BackendResult<Appointment> {
        self.record("create_appointment")?;
        self.created_appointment
            .clone()
            .ok_or_else(|| BackendError::Server { endpoint: "/opd/appointments".into(), status: 500, message: "no fixture configured".into() })
    }

    async fn list_appointments(&self, _patient_id: &str) -> BackendResult<Vec<Appointment>> {
        self.record("list_appointments")?;
        Ok(self.appointments.clone())
    }

    async fn checkin_appointment(&self, appointment_id: &str) -> BackendResult<Appointment> {
        self.record("checkin_appointment")?;
        self.appointments
            .iter()
            .find(|a| a.id == appointment_id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound { endpoint: "/opd/appointments".into() })
    }

    async fn list_opd_queue(&self) -> BackendResult<QueueStatus> {
        self.record("list_opd_queue")?;
        Ok(self.queue.clone())
    }

    async fn bed_availability(&self) -> BackendResult<BedAvailability> {
        self.record("bed_availability")?;
        Ok(self.bed_availability.clone())
    }

    async fn list_beds(&self, status: &str) -> BackendResult<Vec<Bed>> {
        self.record("list_beds")?;
        Ok(self.beds.iter().filter(|b| b.status == status).cloned().collect())
    }

    async fn allocate_bed(&self, _request: &AllocateBedRequest) -> BackendResult<Bed> {
        self.record("allocate_bed")?;
        Err(BackendError::Forbidden { method: "POST".into(), endpoint: "/beds/allocate".into() })
    }

    async fn create_admission(&self, _patient_id: &str) -> BackendResult<AdmissionRequest> {
        self.record("create_admission")?;
        Err(BackendError::Forbidden { method: "POST".into(), endpoint: "/ipd/admissions".into() })
    }

    async fn list_admission_requests(&self) -> BackendResult<Vec<AdmissionRequest>> {
        self.record("list_admission_requests")?;
        Ok(self.admission_requests.clone())
    }

    async fn create_emergency_case(&self, _request: &CreateEmergencyCaseRequest) -> BackendResult<EmergencyCase> {
        self.record("create_emergency_case")?;
        Ok(EmergencyCase { id: "E0001".into(), status: "open".into() })
    }

    async fn list_emergency_queue(&self) -> BackendResult<Vec<EmergencyCase>> {
        self.record("list_emergency_queue")?;
        Ok(self.emergency_queue.clone())
    }

    async fn list_lab_tests(&self) -> BackendResult<Vec<LabTest>> {
        self.record("list_lab_tests")?;
        Ok(self.lab_tests.clone())
    }

    async fn list_lab_orders(&self, _patient_id: &str) -> BackendResult<Vec<LabOrder>> {
        self.record("list_lab_orders")?;
        Ok(self.lab_orders.clone())
    }

    async fn list_patient_bills(&self, _patient_id: &str) -> BackendResult<Vec<Bill>> {
        self.record("list_patient_bills")?;
        Ok(self.bills.clone())
    }

    async fn portal_list_departments(&self, _caller_token: &str) -> BackendResult<Vec<Department>> {
        self.record("portal_list_departments")?;
        Ok(self.departments.clone())
    }

    async fn portal_list_doctors(&self, _caller_token: &str, _department_id: &str) -> BackendResult<Vec<Doctor>> {
        self.record("portal_list_doctors")?;
        Ok(self.doctors.clone())
    }

    async fn portal_list_slots(&self, _caller_token: &str, _doctor_id: &str, _date: &str) -> BackendResult<Vec<Slot>> {
        self.record("portal_list_slots")?;
        Ok(self.slots.clone())
    }

    async fn portal_book_appointment(&self, _caller_token: &str, _request: &PortalBookingRequest) -> BackendResult<Appointment> {
        self.record("portal_book_appointment")?;
        self.created_appointment
            .clone()
            .ok_or_else(|| BackendError::Server { endpoint: "/patient/appointments".into(), status: 500, message: "no fixture configured".into() })
    }

    async fn portal_list_appointments(&self, _caller_token: &str) -> BackendResult<Vec<Appointment>> {
        self.record("portal_list_appointments")?;
        Ok(self.appointments.clone())
    }
}

/// An empty [`Entities`] bag, shorthand for test setup.
#[must_use]
pub fn empty() -> Entities {
    Entities::new()
}
