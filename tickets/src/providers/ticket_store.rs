//! Ticket store trait.
//!
//! Persistence for tickets with an atomic conditional status update, the only
//! mutual-exclusion point of redemption.

use crate::error::Result;
use chrono::{DateTime, Utc};
use gatepass_core::{Ticket, TicketStatus, TicketToken, UserId};

/// Ticket store.
///
/// # Implementation Notes
///
/// - `insert_ticket` must refuse a token that already exists with
///   [`TicketError::DuplicateToken`](crate::TicketError::DuplicateToken)
/// - **CRITICAL**: `compare_and_set_status` MUST be atomic (a single
///   conditional `UPDATE`, a Lua script, or a check-and-set under one lock)
/// - A transition has happened only if the store confirmed it
///
/// # Security Requirements
///
/// 1. **Atomicity**: the status check and the write are indivisible
/// 2. **Single-use**: once `redeemed`, a ticket never returns to `issued`
/// 3. **Legality**: any pair other than `issued → redeemed` is refused with
///    [`TicketError::InvalidTransition`](crate::TicketError::InvalidTransition)
pub trait TicketStore: Send + Sync {
    /// Persist a newly issued ticket.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - A ticket with the same token exists (`DuplicateToken`)
    /// - The storage operation fails (`StorageUnavailable`)
    fn insert_ticket(
        &self,
        ticket: &Ticket,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Look a ticket up by token.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(ticket))`: the ticket exists
    /// - `Ok(None)`: no ticket has this token
    /// - `Err(...)`: storage operation failed
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the storage operation fails, or
    /// `Serialization` if the stored record cannot be read.
    fn find_ticket_by_token(
        &self,
        token: &TicketToken,
    ) -> impl std::future::Future<Output = Result<Option<Ticket>>> + Send;

    /// Atomically move the ticket from `expected` to `new`, recording when and
    /// by whom.
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: the status was `expected` and is now `new`
    /// - `Ok(false)`: the ticket is missing or its status was not `expected`;
    ///   nothing was written
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if `expected → new` is not legal, and
    /// `StorageUnavailable` if the storage operation fails.
    fn compare_and_set_status(
        &self,
        token: &TicketToken,
        expected: TicketStatus,
        new: TicketStatus,
        redeemed_at: DateTime<Utc>,
        redeemed_by: &UserId,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;
}

/// Refuse anything but a legal transition before touching storage.
///
/// # Errors
///
/// Returns `InvalidTransition` if `expected → new` is not legal.
pub fn ensure_legal_transition(expected: TicketStatus, new: TicketStatus) -> Result<()> {
    if expected.can_transition_to(new) {
        Ok(())
    } else {
        Err(crate::TicketError::InvalidTransition {
            from: expected,
            to: new,
        })
    }
}
