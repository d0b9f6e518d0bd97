//! The hospital backend client: a typed operation set authenticated as a
//! service account, plus a caller-token-authenticated patient-portal
//! operation set, both gated by the RBAC allow/deny list and wrapped in
//! retry + circuit-breaker handling.

use async_trait::async_trait;
use careline_config::{BackendConfig, CircuitBreakerConfig, RetryConfig};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::auth::TokenCache;
use crate::circuit_breaker::{CircuitBreaker, CircuitState};
use crate::error::{BackendError, BackendResult};
use crate::rbac;
use crate::retry::RetryHandler;
use crate::types::{
    AdmissionRequest, AllocateBedRequest, Appointment, Bed, BedAvailability, Bill,
    CreateAppointmentRequest, CreateEmergencyCaseRequest, Department, Doctor, EmergencyCase,
    LabOrder, LabTest, LoginRequest, LoginResponse, Patient, PortalBookingRequest, QueueStatus,
    Slot,
};

/// Typed operations against the hospital backend, used by every workflow.
///
/// Implementors may call over HTTP, or (in tests) return canned data; the
/// Workflow Engine only ever depends on this trait, never on a concrete
/// transport.
#[async_trait]
pub trait BackendClient: Send + Sync {
    async fn search_patients(&self, query: &str) -> BackendResult<Vec<Patient>>;
    async fn get_patient(&self, patient_id: &str) -> BackendResult<Patient>;
    async fn create_patient(&self, patient: &serde_json::Value) -> BackendResult<Patient>;

    async fn list_departments(&self) -> BackendResult<Vec<Department>>;
    async fn list_doctors(&self, department_id: &str) -> BackendResult<Vec<Doctor>>;

    async fn create_appointment(
        &self,
        request: &CreateAppointmentRequest,
    ) -> BackendResult<Appointment>;
    async fn list_appointments(&self, patient_id: &str) -> BackendResult<Vec<Appointment>>;
    async fn checkin_appointment(&self, appointment_id: &str) -> BackendResult<Appointment>;
    async fn list_opd_queue(&self) -> BackendResult<QueueStatus>;

    async fn bed_availability(&self) -> BackendResult<BedAvailability>;
    async fn list_beds(&self, status: &str) -> BackendResult<Vec<Bed>>;
    async fn allocate_bed(&self, request: &AllocateBedRequest) -> BackendResult<Bed>;

    async fn create_admission(&self, patient_id: &str) -> BackendResult<AdmissionRequest>;
    async fn list_admission_requests(&self) -> BackendResult<Vec<AdmissionRequest>>;

    async fn create_emergency_case(
        &self,
        request: &CreateEmergencyCaseRequest,
    ) -> BackendResult<EmergencyCase>;
    async fn list_emergency_queue(&self) -> BackendResult<Vec<EmergencyCase>>;

    async fn list_lab_tests(&self) -> BackendResult<Vec<LabTest>>;
    async fn list_lab_orders(&self, patient_id: &str) -> BackendResult<Vec<LabOrder>>;

    async fn list_patient_bills(&self, patient_id: &str) -> BackendResult<Vec<Bill>>;

    // Patient-portal operation set: authenticated with the caller's own
    // bearer token rather than the service account.
    async fn portal_list_departments(&self, caller_token: &str) -> BackendResult<Vec<Department>>;
    async fn portal_list_doctors(
        &self,
        caller_token: &str,
        department_id: &str,
    ) -> BackendResult<Vec<Doctor>>;
    async fn portal_list_slots(
        &self,
        caller_token: &str,
        doctor_id: &str,
        date: &str,
    ) -> BackendResult<Vec<Slot>>;
    async fn portal_book_appointment(
        &self,
        caller_token: &str,
        request: &PortalBookingRequest,
    ) -> BackendResult<Appointment>;
    async fn portal_list_appointments(&self, caller_token: &str) -> BackendResult<Vec<Appointment>>;

    /// Current circuit-breaker state for this client's destination,
    /// surfaced by `GET /health` (spec §6). Implementations with no real
    /// circuit breaker (e.g. test fakes) report `Closed`.
    async fn circuit_state(&self) -> CircuitState {
        CircuitState::Closed
    }
}

/// A `reqwest`-backed [`BackendClient`], with service-account token
/// caching, RBAC enforcement, retries, and a circuit breaker.
pub struct HttpBackendClient {
    http: Client,
    base_url: String,
    credentials: LoginRequest,
    tokens: TokenCache,
    retry: RetryHandler,
    circuit: CircuitBreaker,
}

impl HttpBackendClient {
    #[must_use]
    pub fn new(config: &BackendConfig, retry: &RetryConfig, breaker: CircuitBreakerConfig) -> Self {
        Self {
            http: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            credentials: LoginRequest {
                username: config.username.clone(),
                password: config.password.clone(),
            },
            tokens: TokenCache::new(config.token_cache_hours),
            retry: RetryHandler::new(retry.backend_api),
            circuit: CircuitBreaker::new("hospital-backend", breaker),
        }
    }

    async fn authenticate(&self) -> BackendResult<String> {
        let endpoint = "/auth/login";
        let url = format!("{}{endpoint}", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&self.credentials)
            .send()
            .await
            .map_err(|source| BackendError::Network {
                endpoint: endpoint.to_owned(),
                source,
            })?;
        let body: LoginResponse = parse_response(endpoint, response).await?;
        body.bearer_token()
            .map(str::to_owned)
            .ok_or_else(|| BackendError::MalformedResponse {
                endpoint: endpoint.to_owned(),
                message: "login response had neither accessToken nor token".to_owned(),
            })
    }

    async fn token(&self) -> BackendResult<String> {
        self.tokens.get_or_refresh(|| self.authenticate()).await
    }

    /// Issue one service-account request, policed by RBAC, retried under
    /// the circuit breaker, with a single re-authentication-and-retry on a
    /// 401.
    async fn request<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> BackendResult<T> {
        if !rbac::is_permitted(method.as_str(), path) {
            warn!(method = %method, path, "blocked by access policy");
            return Err(BackendError::Forbidden {
                method: method.to_string(),
                endpoint: path.to_owned(),
            });
        }

        if !self.circuit.allow_call().await {
            return Err(BackendError::CircuitOpen {
                destination: "hospital-backend".to_owned(),
                endpoint: path.to_owned(),
            });
        }

        let result = self
            .retry
            .execute(
                path,
                BackendError::is_retryable,
                || self.attempt_once(&method, path, body),
            )
            .await;

        match &result {
            Ok(_) => self.circuit.record_success().await,
            Err(e) if e.is_retryable() => self.circuit.record_failure().await,
            Err(_) => {}
        }
        result
    }

    async fn attempt_once<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: &Method,
        path: &str,
        body: Option<&B>,
    ) -> BackendResult<T> {
        let token = self.token().await?;
        let response = self.send_once(method, path, body, &token).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            debug!(path, "token rejected; re-authenticating once");
            self.tokens.invalidate().await;
            let token = self.token().await?;
            let response = self.send_once(method, path, body, &token).await?;
            return parse_response(path, response).await;
        }

        parse_response(path, response).await
    }

    async fn send_once<B: Serialize + ?Sized>(
        &self,
        method: &Method,
        path: &str,
        body: Option<&B>,
        token: &str,
    ) -> BackendResult<reqwest::Response> {
        let url = format!("{}{path}", self.base_url);
        let mut builder = self.http.request(method.clone(), &url).bearer_auth(token);
        if let Some(b) = body {
            builder = builder.json(b);
        }
        builder
            .send()
            .await
            .map_err(|source| BackendError::Network {
                endpoint: path.to_owned(),
                source,
            })
    }
}

async fn parse_response<T: DeserializeOwned>(
    endpoint: &str,
    response: reqwest::Response,
) -> BackendResult<T> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(BackendError::Unauthorized {
            endpoint: endpoint.to_owned(),
        });
    }
    if status == StatusCode::FORBIDDEN {
        return Err(BackendError::Forbidden {
            method: String::new(),
            endpoint: endpoint.to_owned(),
        });
    }
    if status == StatusCode::NOT_FOUND {
        return Err(BackendError::NotFound {
            endpoint: endpoint.to_owned(),
        });
    }
    if status == StatusCode::CONFLICT {
        let message = response.text().await.unwrap_or_default();
        return Err(BackendError::Conflict {
            endpoint: endpoint.to_owned(),
            message,
        });
    }
    if status.is_server_error() {
        let message = response.text().await.unwrap_or_default();
        return Err(BackendError::Server {
            endpoint: endpoint.to_owned(),
            status: status.as_u16(),
            message,
        });
    }
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(BackendError::Server {
            endpoint: endpoint.to_owned(),
            status: status.as_u16(),
            message,
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| BackendError::MalformedResponse {
            endpoint: endpoint.to_owned(),
            message: e.to_string(),
        })
}

/// Issues a call under the caller's own bearer token against the
/// `/patient`-prefixed namespace, bypassing the service-account token
/// cache entirely (spec §4.1's portal operation set).
async fn portal_request<B: Serialize + ?Sized, T: DeserializeOwned>(
    http: &Client,
    base_url: &str,
    method: Method,
    path: &str,
    caller_token: &str,
    body: Option<&B>,
) -> BackendResult<T> {
    if !rbac::is_permitted(method.as_str(), path) {
        return Err(BackendError::Forbidden {
            method: method.to_string(),
            endpoint: path.to_owned(),
        });
    }
    let url = format!("{base_url}{path}");
    let mut builder = http.request(method, &url).bearer_auth(caller_token);
    if let Some(b) = body {
        builder = builder.json(b);
    }
    let response = builder
        .send()
        .await
        .map_err(|source| BackendError::Network {
            endpoint: path.to_owned(),
            source,
        })?;
    parse_response(path, response).await
}

#[async_trait]
impl BackendClient for HttpBackendClient {
    async fn search_patients(&self, query: &str) -> BackendResult<Vec<Patient>> {
        let path = format!("/patients/search?query={}", urlencode(query));
        self.request(Method::GET, &path, None::<&()>).await
    }

    async fn get_patient(&self, patient_id: &str) -> BackendResult<Patient> {
        let path = format!("/patients/{patient_id}");
        self.request(Method::GET, &path, None::<&()>).await
    }

    async fn create_patient(&self, patient: &serde_json::Value) -> BackendResult<Patient> {
        self.request(Method::POST, "/patients", Some(patient)).await
    }

    async fn list_departments(&self) -> BackendResult<Vec<Department>> {
        self.request(Method::GET, "/departments", None::<&()>).await
    }

    async fn list_doctors(&self, department_id: &str) -> BackendResult<Vec<Doctor>> {
        let path = format!("/departments/{department_id}/doctors");
        self.request(Method::GET, &path, None::<&()>).await
    }

    async fn create_appointment(
        &self,
        request: &CreateAppointmentRequest,
    ) -> BackendResult<Appointment> {
        self.request(Method::POST, "/opd/appointments", Some(request)).await
    }

    async fn list_appointments(&self, patient_id: &str) -> BackendResult<Vec<Appointment>> {
        let path = format!("/opd/appointments?patientId={patient_id}");
        self.request(Method::GET, &path, None::<&()>).await
    }

    async fn checkin_appointment(&self, appointment_id: &str) -> BackendResult<Appointment> {
        let path = format!("/opd/appointments/{appointment_id}/checkin");
        self.request(Method::PUT, &path, None::<&()>).await
    }

    async fn list_opd_queue(&self) -> BackendResult<QueueStatus> {
        self.request(Method::GET, "/opd/queue", None::<&()>).await
    }

    async fn bed_availability(&self) -> BackendResult<BedAvailability> {
        self.request(Method::GET, "/beds/availability", None::<&()>).await
    }

    async fn list_beds(&self, status: &str) -> BackendResult<Vec<Bed>> {
        let path = format!("/beds?status={status}");
        self.request(Method::GET, &path, None::<&()>).await
    }

    async fn allocate_bed(&self, request: &AllocateBedRequest) -> BackendResult<Bed> {
        self.request(Method::POST, "/beds/allocate", Some(request)).await
    }

    async fn create_admission(&self, patient_id: &str) -> BackendResult<AdmissionRequest> {
        let body = serde_json::json!({ "patientId": patient_id });
        self.request(Method::POST, "/ipd/admissions", Some(&body)).await
    }

    async fn list_admission_requests(&self) -> BackendResult<Vec<AdmissionRequest>> {
        self.request(Method::GET, "/ipd/requests", None::<&()>).await
    }

    async fn create_emergency_case(
        &self,
        request: &CreateEmergencyCaseRequest,
    ) -> BackendResult<EmergencyCase> {
        self.request(Method::POST, "/emergency/cases", Some(request)).await
    }

    async fn list_emergency_queue(&self) -> BackendResult<Vec<EmergencyCase>> {
        self.request(Method::GET, "/emergency/queue", None::<&()>).await
    }

    async fn list_lab_tests(&self) -> BackendResult<Vec<LabTest>> {
        self.request(Method::GET, "/lab/tests", None::<&()>).await
    }

    async fn list_lab_orders(&self, patient_id: &str) -> BackendResult<Vec<LabOrder>> {
        let path = format!("/lab/orders?patientId={patient_id}");
        self.request(Method::GET, &path, None::<&()>).await
    }

    async fn list_patient_bills(&self, patient_id: &str) -> BackendResult<Vec<Bill>> {
        let path = format!("/billing/patient/{patient_id}");
        self.request(Method::GET, &path, None::<&()>).await
    }

    async fn portal_list_departments(&self, caller_token: &str) -> BackendResult<Vec<Department>> {
        portal_request(
            &self.http,
            &self.base_url,
            Method::GET,
            "/patient/appointments/departments",
            caller_token,
            None::<&()>,
        )
        .await
    }

    async fn portal_list_doctors(
        &self,
        caller_token: &str,
        department_id: &str,
    ) -> BackendResult<Vec<Doctor>> {
        let path = format!("/patient/appointments/doctors?departmentId={department_id}");
        portal_request(&self.http, &self.base_url, Method::GET, &path, caller_token, None::<&()>)
            .await
    }

    async fn portal_list_slots(
        &self,
        caller_token: &str,
        doctor_id: &str,
        date: &str,
    ) -> BackendResult<Vec<Slot>> {
        let path = format!("/patient/appointments/slots?doctorId={doctor_id}&date={date}");
        portal_request(&self.http, &self.base_url, Method::GET, &path, caller_token, None::<&()>)
            .await
    }

    async fn portal_book_appointment(
        &self,
        caller_token: &str,
        request: &PortalBookingRequest,
    ) -> BackendResult<Appointment> {
        portal_request(
            &self.http,
            &self.base_url,
            Method::POST,
            "/patient/appointments",
            caller_token,
            Some(request),
        )
        .await
    }

    async fn portal_list_appointments(&self, caller_token: &str) -> BackendResult<Vec<Appointment>> {
        portal_request(
            &self.http,
            &self.base_url,
            Method::GET,
            "/patient/appointments",
            caller_token,
            None::<&()>,
        )
        .await
    }

    async fn circuit_state(&self) -> CircuitState {
        self.circuit.state().await
    }
}

fn urlencode(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{b:02X}"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urlencode_escapes_spaces() {
        assert_eq!(urlencode("john doe"), "john%20doe");
    }

    #[test]
    fn urlencode_passes_through_safe_chars() {
        assert_eq!(urlencode("HIS-2024_0001.a~b"), "HIS-2024_0001.a~b");
    }
}
