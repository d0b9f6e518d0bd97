//! End-to-end HTTP tests against the full router, with a [`FakeBackend`]
//! standing in for the hospital backend (spec §8 end-to-end scenario 1 and
//! the session-lifecycle/§6 contract).

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use careline_backend::types::{Appointment, Department, Doctor, Patient};
use careline_backend::BackendClient;
use careline_config::OrchestratorConfig;
use careline_dialog::{IntentClassifier, RuleBasedClassifier};
use careline_session::SessionStore;
use careline_test::FakeBackend;
use careline_workflows::WorkflowEngine;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::collaborators::{MockSpeechToText, MockTextToSpeech};
use crate::routes;
use crate::state::AppState;

fn fixture_backend() -> FakeBackend {
    FakeBackend::new()
        .with_patients(vec![Patient {
            id: "P000222".into(),
            first_name: "Ravi".into(),
            last_name: "Kumar".into(),
            phone: "9876543210".into(),
            date_of_birth: None,
            gender: None,
        }])
        .with_departments(vec![Department {
            id: "D1".into(),
            name: "Cardiology".into(),
        }])
        .with_doctors(vec![Doctor {
            id: "DOC1".into(),
            first_name: "Anita".into(),
            last_name: "Sharma".into(),
            department_id: Some("D1".into()),
        }])
        .with_created_appointment(Appointment {
            id: "A0001".into(),
            appointment_number: Some("APT-100".into()),
            token_number: Some("T12".into()),
            status: "booked".into(),
            date: "2026-08-01".into(),
            time: None,
            doctor_name: Some("Anita Sharma".into()),
            department: Some("Cardiology".into()),
        })
}

fn test_state(backend: FakeBackend) -> AppState {
    let backend: Arc<dyn BackendClient> = Arc::new(backend);
    let classifier: Arc<dyn IntentClassifier> = Arc::new(RuleBasedClassifier::new());
    let config = OrchestratorConfig::default();
    let sessions = Arc::new(SessionStore::new(config.session.timeout_seconds, config.session.max_turns));
    let engine = Arc::new(WorkflowEngine::new(classifier, Arc::clone(&backend), &config));
    AppState {
        config: Arc::new(config),
        sessions,
        engine,
        backend,
        stt: Arc::new(MockSpeechToText),
        tts: Arc::new(MockTextToSpeech),
    }
}

async fn post_json(app: &axum::Router, path: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("build request");
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    let value: Value = serde_json::from_slice(&bytes).expect("json body");
    (status, value)
}

#[tokio::test]
async fn call_start_returns_a_session_and_greeting() {
    let app = routes::build(test_state(fixture_backend()));
    let (status, body) = post_json(
        &app,
        "/voice/call",
        json!({ "caller_id": "+919876543210", "channel": "phone" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert!(body["session_id"].as_str().is_some());
    assert!(body["requires_input"].as_bool().unwrap());
    let greeting = body["response_text"].as_str().unwrap().to_lowercase();
    assert!(greeting.contains("good"));
}

#[tokio::test]
async fn call_start_rejects_missing_caller_id() {
    let app = routes::build(test_state(fixture_backend()));
    let (status, body) = post_json(&app, "/voice/call", json!({ "caller_id": "", "channel": "phone" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn full_appointment_booking_conversation_completes() {
    let app = routes::build(test_state(fixture_backend()));

    let (_, call) = post_json(
        &app,
        "/voice/call",
        json!({ "caller_id": "+919876543210", "channel": "phone" }),
    )
    .await;
    let session_id = call["session_id"].as_str().unwrap().to_owned();

    let turns = [
        "I want to book an appointment",
        "My phone is 9876543210",
        "Cardiology",
        "Dr. Sharma",
        "Tomorrow",
        "Yes",
    ];

    let mut last = Value::Null;
    for utterance in turns {
        let (status, body) = post_json(
            &app,
            "/conversation/process",
            json!({ "session_id": session_id, "user_input": utterance }),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "turn {utterance:?} failed: {body:?}");
        last = body;
    }

    assert_eq!(last["is_complete"], json!(true));
    let reply = last["response_text"].as_str().unwrap();
    assert!(reply.contains("APT-100"));
    assert!(reply.contains("T12"));
}

#[tokio::test]
async fn unknown_session_on_conversation_process_is_404() {
    let app = routes::build(test_state(fixture_backend()));
    let (status, body) = post_json(
        &app,
        "/conversation/process",
        json!({ "session_id": "does-not-exist", "user_input": "hello" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn emergency_utterance_escalates_and_requires_human() {
    let app = routes::build(test_state(fixture_backend()));
    let (_, call) = post_json(
        &app,
        "/voice/call",
        json!({ "caller_id": "+919876543210", "channel": "phone" }),
    )
    .await;
    let session_id = call["session_id"].as_str().unwrap().to_owned();

    let (status, body) = post_json(
        &app,
        "/conversation/process",
        json!({ "session_id": session_id, "user_input": "there's an emergency, someone collapsed" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["requires_human"], json!(true));
    assert!(body["response_text"].as_str().unwrap().to_lowercase().contains("emergency"));
}

#[tokio::test]
async fn session_get_then_delete_then_404() {
    let app = routes::build(test_state(fixture_backend()));
    let (_, call) = post_json(
        &app,
        "/voice/call",
        json!({ "caller_id": "+919876543210", "channel": "phone" }),
    )
    .await;
    let session_id = call["session_id"].as_str().unwrap().to_owned();

    let get_request = Request::builder()
        .method("GET")
        .uri(format!("/session/{session_id}"))
        .body(Body::empty())
        .expect("build request");
    let response = app.clone().oneshot(get_request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let delete_request = Request::builder()
        .method("DELETE")
        .uri(format!("/session/{session_id}"))
        .body(Body::empty())
        .expect("build request");
    let response = app.clone().oneshot(delete_request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let get_again = Request::builder()
        .method("GET")
        .uri(format!("/session/{session_id}"))
        .body(Body::empty())
        .expect("build request");
    let response = app.clone().oneshot(get_again).await.expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_reports_closed_circuit_and_session_count() {
    let app = routes::build(test_state(fixture_backend()));
    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    let body: Value = serde_json::from_slice(&bytes).expect("json body");
    assert_eq!(body["state"], json!("healthy"));
    assert_eq!(body["active_sessions"], json!(0));
}

#[tokio::test]
async fn synthesize_rejects_out_of_range_speed() {
    let app = routes::build(test_state(fixture_backend()));
    let (status, body) = post_json(&app, "/voice/synthesize", json!({ "text": "hello", "speed": 5.0 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
}
