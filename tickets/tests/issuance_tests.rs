//! Issuance integration tests.
//!
//! Exercise `IssuanceService` end to end against the mock store, including
//! the retry path and artifact re-rendering.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use gatepass_core::{ParticipantMetadata, TicketStatus};
use gatepass_testing::{fixtures, test_clock};
use gatepass_tickets::{
    IssuanceService, RetryPolicy, TicketConfig, TicketEnvironment, TicketError,
    mocks::{MockNotifier, MockTicketStore, MockTokenGenerator},
};
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    store: MockTicketStore,
    tokens: MockTokenGenerator,
    notifier: MockNotifier,
    service: IssuanceService<MockTicketStore, MockTokenGenerator, MockNotifier>,
}

fn harness() -> Harness {
    harness_with(MockTokenGenerator::new())
}

fn harness_with(tokens: MockTokenGenerator) -> Harness {
    let store = MockTicketStore::new();
    let notifier = MockNotifier::new();
    let env = TicketEnvironment::new(
        store.clone(),
        tokens.clone(),
        notifier.clone(),
        Arc::new(test_clock()),
    );
    let config = TicketConfig::default().with_issuance_retry(
        RetryPolicy::default().with_initial_delay(Duration::from_millis(1)),
    );

    Harness {
        store,
        tokens,
        notifier,
        service: IssuanceService::new(env, config),
    }
}

#[tokio::test]
async fn test_issuing_twice_yields_independent_tickets() {
    let h = harness();
    let event = fixtures::event("evt-1");

    let first = h
        .service
        .issue(fixtures::participant(), &event, &fixtures::holder())
        .await
        .unwrap();
    let second = h
        .service
        .issue(fixtures::participant(), &event, &fixtures::holder())
        .await
        .unwrap();

    assert_ne!(first.ticket.token, second.ticket.token);
    assert_ne!(first.artifact, second.artifact);
    assert_eq!(h.store.len(), 2);
    assert_eq!(first.ticket.status, TicketStatus::Issued);
    assert_eq!(second.ticket.status, TicketStatus::Issued);
}

#[tokio::test]
async fn test_transient_insert_failure_retries_with_fresh_token() {
    let h = harness();
    h.store.fail_next_inserts(1);

    let issued = h
        .service
        .issue(fixtures::participant(), &fixtures::event("evt-1"), &fixtures::holder())
        .await
        .unwrap();

    let attempts = h.store.insert_attempts();
    assert_eq!(attempts.len(), 2);
    assert_ne!(attempts[0], attempts[1]);
    assert_eq!(attempts[1], issued.ticket.token);
    assert!(h.store.get(&attempts[0]).is_none());
    assert_eq!(h.store.len(), 1);
}

#[tokio::test]
async fn test_token_collision_is_retried() {
    let h = harness_with(MockTokenGenerator::with_tokens([fixtures::token(0x11)]));
    h.store.seed(&{
        let mut existing = fixtures::ticket("evt-0", &test_clock());
        existing.token = fixtures::token(0x11);
        existing
    });

    let issued = h
        .service
        .issue(fixtures::participant(), &fixtures::event("evt-1"), &fixtures::holder())
        .await
        .unwrap();

    assert_ne!(issued.ticket.token, fixtures::token(0x11));
    assert_eq!(h.tokens.generated().len(), 2);
    assert_eq!(
        h.store.get(&fixtures::token(0x11)).unwrap().event_id.as_str(),
        "evt-0"
    );
}

#[tokio::test]
async fn test_retries_stop_at_max_attempts() {
    let h = harness();
    h.store.fail_next_inserts(10);

    let error = h
        .service
        .issue(fixtures::participant(), &fixtures::event("evt-1"), &fixtures::holder())
        .await
        .unwrap_err();

    assert!(matches!(error, TicketError::StorageUnavailable { operation: "insert", .. }));
    assert_eq!(h.store.insert_attempts().len(), 3);
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn test_oversized_payload_is_not_retried() {
    let h = harness();
    let huge = ParticipantMetadata::new().with("bio", "x".repeat(5_000));

    let error = h
        .service
        .issue(huge, &fixtures::event("evt-1"), &fixtures::holder())
        .await
        .unwrap_err();

    assert!(matches!(error, TicketError::Encoding { .. }));
    assert_eq!(h.tokens.generated().len(), 1);
    assert!(h.store.insert_attempts().is_empty());
}

#[tokio::test]
async fn test_notifier_failure_does_not_undo_issuance() {
    let h = harness();
    h.notifier.set_failing(true);

    let issued = h
        .service
        .issue(fixtures::participant(), &fixtures::event("evt-1"), &fixtures::holder())
        .await
        .unwrap();

    assert!(h.store.get(&issued.ticket.token).is_some());
    assert!(h.notifier.delivered().is_empty());
}

#[tokio::test]
async fn test_reissued_artifact_is_byte_identical() {
    let h = harness();
    let issued = h
        .service
        .issue(fixtures::participant(), &fixtures::event("evt-1"), &fixtures::holder())
        .await
        .unwrap();

    let reissued = h
        .service
        .reissue_artifact(&issued.ticket.token)
        .await
        .unwrap()
        .expect("ticket exists");

    assert_eq!(reissued.payload, issued.payload);
    assert_eq!(reissued.artifact.as_bytes(), issued.artifact.as_bytes());
    assert_eq!(reissued.artifact.data_uri(), issued.artifact.data_uri());
}
