//! Console notifier for development and testing.

use crate::artifact::TicketArtifact;
use crate::error::Result;
use crate::providers::TicketNotifier;
use gatepass_core::Ticket;
use tracing::info;

/// Console notifier.
///
/// Logs issued tickets instead of delivering them. The token itself is never
/// logged, only its fingerprint.
#[derive(Clone, Debug, Default)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    /// Create a new console notifier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl TicketNotifier for ConsoleNotifier {
    async fn ticket_issued(&self, ticket: &Ticket, artifact: &TicketArtifact) -> Result<()> {
        info!(
            token = %ticket.token.fingerprint(),
            event_id = %ticket.event_id,
            user_id = %ticket.user_id,
            to = ticket.participant.email().unwrap_or("<no email>"),
            participant = ticket.participant.display_name(),
            png_bytes = artifact.as_bytes().len(),
            "Ticket issued (development mode, not delivered)"
        );
        Ok(())
    }
}
