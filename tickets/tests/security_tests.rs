//! Security-focused integration tests.
//!
//! Verify the single-admission guarantee under concurrency: however many
//! scanners race on one ticket, exactly one is let in.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use futures::future::join_all;
use gatepass_core::{Principal, Role, SystemClock};
use gatepass_testing::fixtures;
use gatepass_tickets::{
    IssuanceService, OsTokenGenerator, Rejection, TicketConfig, TicketEnvironment,
    ValidationService, providers::ConsoleNotifier, stores::InMemoryTicketStore,
};
use std::sync::Arc;

const SCANNERS: usize = 50;

/// **Single admission under concurrent scans**
///
/// Fifty stations scan the same fresh ticket at once. The conditional update
/// in the store lets exactly one through; every other station sees
/// `AlreadyUsed` naming the winner.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_scans_admit_exactly_once() {
    let store = InMemoryTicketStore::new();
    let env = TicketEnvironment::new(
        store.clone(),
        OsTokenGenerator,
        ConsoleNotifier::new(),
        Arc::new(SystemClock),
    );
    let config = TicketConfig::default();
    let issuance = IssuanceService::new(env, config.clone());
    let validation = ValidationService::new(store.clone(), Arc::new(SystemClock), config.storage_timeout);

    let issued = issuance
        .issue(fixtures::participant(), &fixtures::event("evt-1"), &fixtures::holder())
        .await
        .unwrap();

    let scans = (0..SCANNERS).map(|station| {
        let validation = validation.clone();
        let payload = issued.payload.clone();
        tokio::spawn(async move {
            let context = fixtures::station("evt-1").at_station(format!("door-{station}"));
            let operator = Principal::new(format!("staff-{station}"), Role::Organizer);
            validation.validate(&payload, &context, &operator).await
        })
    });

    let outcomes: Vec<_> = join_all(scans)
        .await
        .into_iter()
        .map(|joined| joined.expect("scan task panicked").expect("storage is healthy"))
        .collect();

    let accepted = outcomes.iter().filter(|o| o.is_accepted()).count();
    assert_eq!(accepted, 1);

    let winner = store.get(&issued.ticket.token).unwrap().redeemed_by.unwrap();
    for outcome in outcomes.iter().filter(|o| !o.is_accepted()) {
        match outcome.rejection() {
            Some(Rejection::AlreadyUsed {
                previous_redeemed_by,
                ..
            }) => assert_eq!(previous_redeemed_by.as_ref(), Some(&winner)),
            other => unreachable!("expected AlreadyUsed, got {other:?}"),
        }
    }
}

/// **Replay of a redeemed ticket**
///
/// A screenshot of a used ticket must keep failing, whether presented as the
/// full payload or as the bare token.
#[tokio::test]
async fn test_redeemed_ticket_cannot_be_replayed() {
    let store = InMemoryTicketStore::new();
    let env = TicketEnvironment::new(
        store.clone(),
        OsTokenGenerator,
        ConsoleNotifier::new(),
        Arc::new(SystemClock),
    );
    let issuance = IssuanceService::new(env, TicketConfig::default());
    let validation = ValidationService::new(store, Arc::new(SystemClock), TicketConfig::default().storage_timeout);
    let issued = issuance
        .issue(fixtures::participant(), &fixtures::event("evt-1"), &fixtures::holder())
        .await
        .unwrap();
    let door = fixtures::station("evt-1");
    let operator = fixtures::operator();

    assert!(validation.validate(&issued.payload, &door, &operator).await.unwrap().is_accepted());

    for replay in [issued.payload.clone(), issued.ticket.token.as_str().to_string()] {
        let outcome = validation.validate(&replay, &door, &operator).await.unwrap();
        assert_eq!(outcome.rejection().map(Rejection::reason), Some("already_used"));
    }
}

/// **Forged payload**
///
/// Display fields in the payload carry no authority: a payload naming the
/// right event but holding an unknown token is refused.
#[tokio::test]
async fn test_forged_payload_is_unknown() {
    let store = InMemoryTicketStore::new();
    let validation = ValidationService::new(store, Arc::new(SystemClock), TicketConfig::default().storage_timeout);
    let forged = format!(
        r#"{{"token":"{}","event_id":"evt-1","event_name":"Event evt-1","participant":{{"name":"Mallory"}}}}"#,
        "0".repeat(64)
    );

    let outcome = validation
        .validate(&forged, &fixtures::station("evt-1"), &fixtures::operator())
        .await
        .unwrap();

    assert_eq!(outcome.rejection(), Some(&Rejection::UnknownTicket));
}
