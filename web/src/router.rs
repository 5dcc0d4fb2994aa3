//! Router configuration.

use crate::handlers::{get_artifact, get_ticket, health_check, issue_ticket, metrics, scan_ticket};
use crate::middleware::correlation_id_layer;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use gatepass_tickets::TokenGenerator;
use gatepass_tickets::providers::{TicketNotifier, TicketStore};
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// - `GET /health`, `GET /metrics`
/// - `/api/v1/tickets` issuance and lookup
/// - `/api/v1/events/:event_id/scans` door validation
pub fn build_router<S, G, N>(state: AppState<S, G, N>) -> Router
where
    S: TicketStore + Clone + 'static,
    G: TokenGenerator + Clone + 'static,
    N: TicketNotifier + Clone + 'static,
{
    let api_routes = Router::new()
        .route("/tickets", post(issue_ticket::<S, G, N>))
        .route("/tickets/:token", get(get_ticket::<S, G, N>))
        .route("/tickets/:token/artifact", get(get_artifact::<S, G, N>))
        .route("/events/:event_id/scans", post(scan_ticket::<S, G, N>));

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics::<S, G, N>))
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .with_state(state)
}
