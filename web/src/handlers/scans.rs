//! Door scanning endpoint.
//!
//! `POST /api/v1/events/:event_id/scans` validates the text a scanner decoded
//! from a QR code and, if the ticket is good, redeems it. The answer is always
//! `200 OK` with an [`OutcomeView`]; only infrastructure failures are errors.

use crate::extractors::{Caller, CorrelationId};
use crate::state::AppState;
use crate::WebResult;
use axum::{
    Json,
    extract::{Path, State},
};
use gatepass_core::{EventContext, Role};
use gatepass_tickets::providers::{TicketNotifier, TicketStore};
use gatepass_tickets::{OutcomeView, TokenGenerator};
use serde::Deserialize;

/// A single scan at the door.
#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    /// Raw text decoded by the scanner
    pub scanned_text: String,
    /// Entrance or device the scan came from
    #[serde(default)]
    pub station_id: Option<String>,
}

/// Validate and redeem a scanned ticket.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/v1/events/evt-rustconf-2025/scans \
///   -H "X-Gatepass-User-Id: staff-grace" \
///   -H "X-Gatepass-Role: organizer" \
///   -H "Content-Type: application/json" \
///   -d '{"scanned_text": "{\"token\":\"…\"}", "station_id": "door-1"}'
/// ```
///
/// # Errors
///
/// - `403` unless the caller is `organizer` or `admin`
/// - `503 TRY_AGAIN` if the store failed; the ticket was not redeemed by this
///   scan and the operator may rescan
pub async fn scan_ticket<S, G, N>(
    State(state): State<AppState<S, G, N>>,
    correlation_id: CorrelationId,
    caller: Caller,
    Path(event_id): Path<String>,
    Json(request): Json<ScanRequest>,
) -> WebResult<Json<OutcomeView>>
where
    S: TicketStore + Clone,
    G: TokenGenerator + Clone,
    N: TicketNotifier + Clone,
{
    let validator = caller.require(Role::can_scan, "scan tickets")?;

    let mut context = EventContext::new(event_id);
    if let Some(station_id) = request.station_id {
        context = context.at_station(station_id);
    }

    let outcome = state
        .validation
        .validate(&request.scanned_text, &context, validator)
        .await?;

    tracing::debug!(
        correlation_id = %correlation_id.0,
        event_id = %context.event_id,
        outcome = outcome.label(),
        "Scan handled"
    );

    Ok(Json(OutcomeView::from(&outcome)))
}
