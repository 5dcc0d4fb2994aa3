//! Ticket environment.
//!
//! Every collaborator of issuance and validation, constructed once at the
//! process entry point and injected into the services.

use crate::error::{Result, TicketError};
use crate::metrics::TicketMetrics;
use crate::providers::{TicketNotifier, TicketStore};
use crate::token::TokenGenerator;
use gatepass_core::Clock;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Ticket environment.
///
/// # Type Parameters
///
/// - `S`: Ticket store
/// - `G`: Token generator
/// - `N`: Ticket notifier
#[derive(Clone)]
pub struct TicketEnvironment<S, G, N>
where
    S: TicketStore + Clone,
    G: TokenGenerator + Clone,
    N: TicketNotifier + Clone,
{
    /// Ticket store (in-memory, `Redis` or `PostgreSQL`).
    pub store: S,

    /// Token generator (`OsRng` in production).
    pub tokens: G,

    /// Delivers issued tickets to their holders.
    pub notifier: N,

    /// Clock for `issued_at` and `redeemed_at`.
    pub clock: Arc<dyn Clock>,
}

impl<S, G, N> TicketEnvironment<S, G, N>
where
    S: TicketStore + Clone,
    G: TokenGenerator + Clone,
    N: TicketNotifier + Clone,
{
    /// Create a new environment.
    #[must_use]
    pub fn new(store: S, tokens: G, notifier: N, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            tokens,
            notifier,
            clock,
        }
    }
}

/// Run a store call, failing with `StorageUnavailable` if it does not finish
/// within `timeout`.
///
/// Storage failures and timeouts are counted per operation.
///
/// # Errors
///
/// Returns the call's own error, or `StorageUnavailable` on timeout.
pub async fn bounded<T>(
    timeout: Duration,
    operation: &'static str,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => {
            if error.is_storage_failure() {
                TicketMetrics::record_storage_failure(operation);
                tracing::error!(operation, error = %error, "Ticket store call failed");
            }
            Err(error)
        }
        Err(_) => {
            TicketMetrics::record_storage_failure(operation);
            tracing::error!(operation, timeout_ms = timeout.as_millis(), "Ticket store call timed out");
            Err(TicketError::storage(
                operation,
                format!("no answer within {}ms", timeout.as_millis()),
            ))
        }
    }
}
