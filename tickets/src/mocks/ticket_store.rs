//! Mock ticket store with fault injection.

use crate::constants::operations;
use crate::error::{Result, TicketError};
use crate::providers::TicketStore;
use crate::stores::InMemoryTicketStore;
use chrono::{DateTime, Utc};
use gatepass_core::{Ticket, TicketStatus, TicketToken, UserId};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
struct Faults {
    unavailable: bool,
    failing_inserts: usize,
    duplicate_inserts: usize,
    latency: Option<Duration>,
    drop_compare_and_set: bool,
}

/// Mock ticket store.
///
/// Behaves like [`InMemoryTicketStore`] until a fault is switched on.
/// Clones share state, so a test can keep a handle while a service owns
/// another.
#[derive(Debug, Clone, Default)]
pub struct MockTicketStore {
    inner: InMemoryTicketStore,
    faults: Arc<Mutex<Faults>>,
    insert_attempts: Arc<Mutex<Vec<TicketToken>>>,
    compare_and_set_calls: Arc<AtomicUsize>,
}

impl MockTicketStore {
    /// Create a healthy, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with `StorageUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.faults().unavailable = unavailable;
    }

    /// Fail the next `count` inserts with `StorageUnavailable`.
    pub fn fail_next_inserts(&self, count: usize) {
        self.faults().failing_inserts = count;
    }

    /// Refuse the next `count` inserts with `DuplicateToken`.
    pub fn reject_next_inserts_as_duplicate(&self, count: usize) {
        self.faults().duplicate_inserts = count;
    }

    /// Delay every call.
    pub fn set_latency(&self, latency: Duration) {
        self.faults().latency = Some(latency);
    }

    /// Answer `false` to conditional updates without writing anything.
    pub fn drop_compare_and_set(&self, drop: bool) {
        self.faults().drop_compare_and_set = drop;
    }

    /// Put a ticket in the store directly, bypassing faults.
    pub fn seed(&self, ticket: &Ticket) {
        self.inner.put(ticket.clone());
    }

    /// Read a ticket directly, bypassing faults.
    #[must_use]
    pub fn get(&self, token: &TicketToken) -> Option<Ticket> {
        self.inner.get(token)
    }

    /// Number of stored tickets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if no ticket is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Tokens of every insert attempted, failed ones included.
    #[must_use]
    pub fn insert_attempts(&self) -> Vec<TicketToken> {
        self.insert_attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of conditional updates attempted.
    #[must_use]
    pub fn compare_and_set_calls(&self) -> usize {
        self.compare_and_set_calls.load(Ordering::SeqCst)
    }

    fn faults(&self) -> MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn delay(&self) {
        let latency = self.faults().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn check_available(&self, operation: &'static str) -> Result<()> {
        if self.faults().unavailable {
            Err(TicketError::storage(operation, "mock store unavailable"))
        } else {
            Ok(())
        }
    }
}

impl TicketStore for MockTicketStore {
    async fn insert_ticket(&self, ticket: &Ticket) -> Result<()> {
        self.delay().await;
        self.insert_attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ticket.token.clone());
        self.check_available(operations::INSERT)?;

        {
            let mut faults = self.faults();
            if faults.failing_inserts > 0 {
                faults.failing_inserts -= 1;
                return Err(TicketError::storage(operations::INSERT, "injected insert failure"));
            }
            if faults.duplicate_inserts > 0 {
                faults.duplicate_inserts -= 1;
                return Err(TicketError::DuplicateToken {
                    fingerprint: ticket.token.fingerprint().to_string(),
                });
            }
        }

        self.inner.insert_ticket(ticket).await
    }

    async fn find_ticket_by_token(&self, token: &TicketToken) -> Result<Option<Ticket>> {
        self.delay().await;
        self.check_available(operations::FIND)?;
        self.inner.find_ticket_by_token(token).await
    }

    async fn compare_and_set_status(
        &self,
        token: &TicketToken,
        expected: TicketStatus,
        new: TicketStatus,
        redeemed_at: DateTime<Utc>,
        redeemed_by: &UserId,
    ) -> Result<bool> {
        self.delay().await;
        self.compare_and_set_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available(operations::COMPARE_AND_SET)?;

        let dropped = self.faults().drop_compare_and_set;
        if dropped {
            return Ok(false);
        }

        self.inner
            .compare_and_set_status(token, expected, new, redeemed_at, redeemed_by)
            .await
    }
}
