//! In-memory ticket store.
//!
//! Single-process store for development and tests. The conditional update
//! runs under one mutex acquisition, which is all the atomicity a single
//! process needs.

use crate::constants::operations;
use crate::error::{Result, TicketError};
use crate::providers::TicketStore;
use crate::providers::ticket_store::ensure_legal_transition;
use chrono::{DateTime, Utc};
use gatepass_core::{Ticket, TicketStatus, TicketToken, UserId};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex, PoisonError};

/// In-memory ticket store.
///
/// Cloning shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTicketStore {
    tickets: Arc<Mutex<HashMap<TicketToken, Ticket>>>,
}

impl InMemoryTicketStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tickets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if no ticket is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Read a ticket without going through the async trait.
    #[must_use]
    pub fn get(&self, token: &TicketToken) -> Option<Ticket> {
        self.lock().get(token).cloned()
    }

    /// Store a ticket as-is, replacing any ticket with the same token.
    #[cfg_attr(not(feature = "test-utils"), allow(dead_code))]
    pub(crate) fn put(&self, ticket: Ticket) {
        self.lock().insert(ticket.token.clone(), ticket);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<TicketToken, Ticket>> {
        self.tickets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TicketStore for InMemoryTicketStore {
    async fn insert_ticket(&self, ticket: &Ticket) -> Result<()> {
        match self.lock().entry(ticket.token.clone()) {
            Entry::Occupied(_) => Err(TicketError::DuplicateToken {
                fingerprint: ticket.token.fingerprint().to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(ticket.clone());
                Ok(())
            }
        }
    }

    async fn find_ticket_by_token(&self, token: &TicketToken) -> Result<Option<Ticket>> {
        Ok(self.lock().get(token).cloned())
    }

    async fn compare_and_set_status(
        &self,
        token: &TicketToken,
        expected: TicketStatus,
        new: TicketStatus,
        redeemed_at: DateTime<Utc>,
        redeemed_by: &UserId,
    ) -> Result<bool> {
        ensure_legal_transition(expected, new)?;

        let mut tickets = self.lock();
        let applied = tickets
            .get_mut(token)
            .is_some_and(|ticket| ticket.transition(expected, new, redeemed_at, redeemed_by));

        tracing::trace!(
            token = %token.fingerprint(),
            operation = operations::COMPARE_AND_SET,
            applied,
            "In-memory conditional update"
        );

        Ok(applied)
    }
}
