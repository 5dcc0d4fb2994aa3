//! HTTP API tests.
//!
//! Drive the full router through `axum-test`: identity headers, role gating,
//! the issue → scan → rescan flow and the mapping of storage failures to
//! `503 TRY_AGAIN`.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::{TestRequest, TestServer};
use gatepass_core::TicketStatus;
use gatepass_testing::{fixtures, test_clock};
use gatepass_tickets::mocks::{MockNotifier, MockTicketStore, MockTokenGenerator};
use gatepass_tickets::{RetryPolicy, TicketConfig, TicketEnvironment};
use gatepass_web::{AppState, CORRELATION_ID_HEADER, build_router};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::{Value, json};
use std::sync::Arc;

const ISSUER: (&str, &str) = ("registration", "service");
const STAFF: (&str, &str) = (fixtures::OPERATOR_ID, "organizer");
const HOLDER: (&str, &str) = (fixtures::HOLDER_ID, "participant");
const STRANGER: (&str, &str) = ("user-mallory", "participant");

struct Harness {
    server: TestServer,
    store: MockTicketStore,
}

fn harness() -> Harness {
    harness_with_metrics(false)
}

fn harness_with_metrics(metrics: bool) -> Harness {
    gatepass_testing::init_test_tracing();
    let store = MockTicketStore::new();
    let env = TicketEnvironment::new(
        store.clone(),
        MockTokenGenerator::new(),
        MockNotifier::new(),
        Arc::new(test_clock()),
    );
    let config = TicketConfig::default().with_issuance_retry(RetryPolicy::no_retry());
    let handle = metrics.then(|| PrometheusBuilder::new().build_recorder().handle());
    let state = AppState::new(env, config).with_metrics(handle);

    Harness {
        server: TestServer::new(build_router(state)).unwrap(),
        store,
    }
}

fn as_caller(request: TestRequest, (user_id, role): (&str, &str)) -> TestRequest {
    request
        .add_header(
            HeaderName::from_static("x-gatepass-user-id"),
            HeaderValue::from_str(user_id).unwrap(),
        )
        .add_header(
            HeaderName::from_static("x-gatepass-role"),
            HeaderValue::from_str(role).unwrap(),
        )
}

fn issue_body(event_id: &str) -> Value {
    json!({
        "event": {"id": event_id, "name": "RustConf 2025"},
        "user": {"id": fixtures::HOLDER_ID},
        "participant": {"name": "Ada Lovelace", "email": "ada@example.com"},
    })
}

impl Harness {
    async fn issue(&self) -> Value {
        let response = as_caller(self.server.post("/api/v1/tickets"), ISSUER)
            .json(&issue_body(fixtures::EVENT_ID))
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        response.json::<Value>()
    }

    async fn scan(&self, event_id: &str, scanned_text: &str) -> Value {
        let response = as_caller(
            self.server.post(&format!("/api/v1/events/{event_id}/scans")),
            STAFF,
        )
        .json(&json!({"scanned_text": scanned_text, "station_id": "door-1"}))
        .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        response.json::<Value>()
    }
}

fn token_of(ticket: &Value) -> String {
    ticket["token"].as_str().unwrap().to_string()
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_needs_no_identity() {
    let harness = harness();

    let response = harness.server.get("/health").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.text(), "ok");
}

#[tokio::test]
async fn test_metrics_disabled_is_not_found() {
    let harness = harness();

    let response = harness.server.get("/metrics").await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_enabled_renders_prometheus_text() {
    let harness = harness_with_metrics(true);

    let response = harness.server.get("/metrics").await;

    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_correlation_id_is_echoed() {
    let harness = harness();
    let id = "6f1c2a6e-4d8e-4b7a-9a51-0d3f0c9b8e21";

    let response = harness
        .server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-correlation-id"),
            HeaderValue::from_static(id),
        )
        .await;

    assert_eq!(response.header(CORRELATION_ID_HEADER), id);
}

// ============================================================================
// Identity and roles
// ============================================================================

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let harness = harness();

    let response = harness
        .server
        .post("/api/v1/tickets")
        .json(&issue_body(fixtures::EVENT_ID))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_unknown_role_is_unauthorized() {
    let harness = harness();

    let response = as_caller(harness.server.post("/api/v1/tickets"), ("x", "superuser"))
        .json(&issue_body(fixtures::EVENT_ID))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_participant_cannot_issue_or_scan() {
    let harness = harness();

    let issue = as_caller(harness.server.post("/api/v1/tickets"), HOLDER)
        .json(&issue_body(fixtures::EVENT_ID))
        .await;
    let scan = as_caller(
        harness
            .server
            .post(&format!("/api/v1/events/{}/scans", fixtures::EVENT_ID)),
        HOLDER,
    )
    .json(&json!({"scanned_text": fixtures::token(1).as_str()}))
    .await;

    assert_eq!(issue.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(scan.status_code(), StatusCode::FORBIDDEN);
    assert!(harness.store.is_empty());
}

// ============================================================================
// Issuance
// ============================================================================

#[tokio::test]
async fn test_issue_returns_ticket_and_artifact() {
    let harness = harness();

    let ticket = harness.issue().await;

    assert_eq!(ticket["event_id"], fixtures::EVENT_ID);
    assert_eq!(ticket["user_id"], fixtures::HOLDER_ID);
    assert_eq!(ticket["status"], "issued");
    assert_eq!(ticket["participant_display"], "Ada Lovelace");
    assert!(ticket.get("redeemed_at").is_none());
    assert!(
        ticket["artifact"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,")
    );
    assert_eq!(harness.store.len(), 1);
}

#[tokio::test]
async fn test_nested_participant_field_is_unprocessable() {
    let harness = harness();

    let response = as_caller(harness.server.post("/api/v1/tickets"), ISSUER)
        .json(&json!({
            "event": {"id": fixtures::EVENT_ID, "name": "RustConf 2025"},
            "user": {"id": fixtures::HOLDER_ID},
            "participant": {"tags": ["speaker"]},
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(harness.store.is_empty());
}

#[tokio::test]
async fn test_issue_during_outage_is_try_again() {
    let harness = harness();
    harness.store.set_unavailable(true);

    let response = as_caller(harness.server.post("/api/v1/tickets"), ISSUER)
        .json(&issue_body(fixtures::EVENT_ID))
        .await;

    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.json::<Value>()["code"], "TRY_AGAIN");
}

// ============================================================================
// Scanning
// ============================================================================

#[tokio::test]
async fn test_scan_admits_once() {
    let harness = harness();
    let token = token_of(&harness.issue().await);
    let scanned = json!({"token": token}).to_string();

    let first = harness.scan(fixtures::EVENT_ID, &scanned).await;
    let second = harness.scan(fixtures::EVENT_ID, &scanned).await;

    assert_eq!(first["accepted"], true);
    assert_eq!(first["participant_display"], "Ada Lovelace");
    assert!(first.get("reason").is_none());

    assert_eq!(second["accepted"], false);
    assert_eq!(second["reason"], "already_used");
    assert_eq!(second["previous_redeemed_by"], fixtures::OPERATOR_ID);
    assert_eq!(second["participant_display"], "Ada Lovelace");
}

#[tokio::test]
async fn test_scan_at_wrong_event_is_rejected_without_redeeming() {
    let harness = harness();
    let token = token_of(&harness.issue().await);

    let outcome = harness.scan("evt-other", &token).await;

    assert_eq!(outcome["accepted"], false);
    assert_eq!(outcome["reason"], "wrong_event");
    assert_eq!(outcome["event_id"], fixtures::EVENT_ID);
    let stored = harness
        .store
        .get(&gatepass_core::TicketToken::new(token))
        .unwrap();
    assert_eq!(stored.status, TicketStatus::Issued);
}

#[tokio::test]
async fn test_scan_of_garbage_is_malformed() {
    let harness = harness();

    let outcome = harness.scan(fixtures::EVENT_ID, "not a ticket \u{1F3AB}").await;

    assert_eq!(outcome["accepted"], false);
    assert_eq!(outcome["reason"], "malformed_qr");
}

#[tokio::test]
async fn test_scan_of_payload_with_control_characters_is_malformed() {
    let harness = harness();
    let scanned = json!({"token": "a\u{0}b"}).to_string();

    let outcome = harness.scan(fixtures::EVENT_ID, &scanned).await;

    assert_eq!(outcome["accepted"], false);
    assert_eq!(outcome["reason"], "malformed_qr");
}

#[tokio::test]
async fn test_scan_of_unknown_token_is_rejected() {
    let harness = harness();

    let outcome = harness
        .scan(fixtures::EVENT_ID, fixtures::token(7).as_str())
        .await;

    assert_eq!(outcome["reason"], "unknown_ticket");
}

#[tokio::test]
async fn test_scan_during_outage_is_try_again() {
    let harness = harness();
    let ticket = fixtures::ticket(fixtures::EVENT_ID, &test_clock());
    harness.store.seed(&ticket);
    harness.store.set_unavailable(true);

    let response = as_caller(
        harness
            .server
            .post(&format!("/api/v1/events/{}/scans", fixtures::EVENT_ID)),
        STAFF,
    )
    .json(&json!({"scanned_text": ticket.token.as_str()}))
    .await;

    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.json::<Value>()["code"], "TRY_AGAIN");

    harness.store.set_unavailable(false);
    assert_eq!(
        harness.store.get(&ticket.token).unwrap().status,
        TicketStatus::Issued
    );
    let outcome = harness.scan(fixtures::EVENT_ID, ticket.token.as_str()).await;
    assert_eq!(outcome["accepted"], true);
}

// ============================================================================
// Ticket lookup
// ============================================================================

#[tokio::test]
async fn test_holder_and_staff_can_read_ticket() {
    let harness = harness();
    let token = token_of(&harness.issue().await);
    harness.scan(fixtures::EVENT_ID, &token).await;
    let path = format!("/api/v1/tickets/{token}");

    let holder = as_caller(harness.server.get(&path), HOLDER).await;
    let staff = as_caller(harness.server.get(&path), STAFF).await;

    assert_eq!(holder.status_code(), StatusCode::OK);
    assert_eq!(holder.json::<Value>()["status"], "redeemed");
    assert_eq!(holder.json::<Value>()["redeemed_by"], fixtures::OPERATOR_ID);
    assert_eq!(staff.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_other_participant_cannot_see_ticket() {
    let harness = harness();
    let token = token_of(&harness.issue().await);

    let response = as_caller(harness.server.get(&format!("/api/v1/tickets/{token}")), STRANGER).await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_ticket_is_not_found() {
    let harness = harness();

    let response = as_caller(
        harness
            .server
            .get(&format!("/api/v1/tickets/{}", fixtures::token(9).as_str())),
        STAFF,
    )
    .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_artifact_matches_issuance() {
    let harness = harness();
    let ticket = harness.issue().await;
    let token = token_of(&ticket);

    let response = as_caller(
        harness.server.get(&format!("/api/v1/tickets/{token}/artifact")),
        HOLDER,
    )
    .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["artifact"], ticket["artifact"]);
}
