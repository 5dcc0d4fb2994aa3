//! Ticket notifier trait.

use crate::artifact::TicketArtifact;
use crate::error::Result;
use gatepass_core::Ticket;

/// Delivers an issued ticket to its holder (email, push, ...).
///
/// Called after the ticket is persisted. A delivery failure never undoes
/// issuance; the holder can always re-fetch the artifact.
pub trait TicketNotifier: Send + Sync {
    /// Announce an issued ticket.
    ///
    /// # Errors
    ///
    /// Returns `Notification` if delivery fails.
    fn ticket_issued(
        &self,
        ticket: &Ticket,
        artifact: &TicketArtifact,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
