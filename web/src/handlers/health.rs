//! Health and metrics endpoints.
//!
//! Used by load balancers and Prometheus; neither requires a caller identity.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode};
use gatepass_tickets::TokenGenerator;
use gatepass_tickets::providers::{TicketNotifier, TicketStore};

/// Liveness check.
///
/// Does not touch the ticket store: a store outage makes scans answer
/// `503 TRY_AGAIN`, it does not make the process unhealthy.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Prometheus scrape endpoint.
///
/// Returns `404 Not Found` when the server runs with metrics disabled.
///
/// # Endpoint
///
/// ```text
/// GET /metrics
/// ```
#[allow(clippy::unused_async)]
pub async fn metrics<S, G, N>(State(state): State<AppState<S, G, N>>) -> (StatusCode, String)
where
    S: TicketStore + Clone,
    G: TokenGenerator + Clone,
    N: TicketNotifier + Clone,
{
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics disabled".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_health_check() {
        let (status, body) = tokio_test::block_on(health_check());
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }
}
