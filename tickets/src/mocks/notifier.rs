//! Mock ticket notifier.

use crate::artifact::TicketArtifact;
use crate::error::{Result, TicketError};
use crate::providers::TicketNotifier;
use gatepass_core::{Ticket, TicketToken};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Mock notifier.
///
/// Records every delivery; can be switched to fail.
#[derive(Debug, Clone, Default)]
pub struct MockNotifier {
    delivered: Arc<Mutex<Vec<(TicketToken, TicketArtifact)>>>,
    failing: Arc<AtomicBool>,
}

impl MockNotifier {
    /// Create a new mock notifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every delivery fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Tokens and artifacts delivered so far.
    #[must_use]
    pub fn delivered(&self) -> Vec<(TicketToken, TicketArtifact)> {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TicketNotifier for MockNotifier {
    async fn ticket_issued(&self, ticket: &Ticket, artifact: &TicketArtifact) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TicketError::Notification("mock delivery failure".to_string()));
        }

        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((ticket.token.clone(), artifact.clone()));
        Ok(())
    }
}
