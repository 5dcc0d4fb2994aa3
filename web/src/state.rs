//! Application state for the HTTP server.
//!
//! Holds the two ticket services and the optional Prometheus handle. Cloned
//! per request; every field is cheap to clone.

use gatepass_tickets::providers::{TicketNotifier, TicketStore};
use gatepass_tickets::{
    IssuanceService, TicketConfig, TicketEnvironment, TokenGenerator, ValidationService,
};
use metrics_exporter_prometheus::PrometheusHandle;

/// Application state shared across all HTTP handlers.
///
/// # Type Parameters
///
/// - `S`: Ticket store
/// - `G`: Token generator
/// - `N`: Ticket notifier
#[derive(Clone)]
pub struct AppState<S, G, N>
where
    S: TicketStore + Clone,
    G: TokenGenerator + Clone,
    N: TicketNotifier + Clone,
{
    /// Issues tickets and re-renders artifacts.
    pub issuance: IssuanceService<S, G, N>,

    /// Validates scans and reads ticket status.
    pub validation: ValidationService<S>,

    /// Renders `/metrics`; `None` when metrics are disabled.
    pub metrics: Option<PrometheusHandle>,
}

impl<S, G, N> AppState<S, G, N>
where
    S: TicketStore + Clone,
    G: TokenGenerator + Clone,
    N: TicketNotifier + Clone,
{
    /// Build both services over one environment.
    ///
    /// Issuance and validation share the store and the clock.
    #[must_use]
    pub fn new(env: TicketEnvironment<S, G, N>, config: TicketConfig) -> Self {
        let validation = ValidationService::new(
            env.store.clone(),
            env.clock.clone(),
            config.storage_timeout,
        );

        Self {
            issuance: IssuanceService::new(env, config),
            validation,
            metrics: None,
        }
    }

    /// Serve `/metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.metrics = handle;
        self
    }
}
