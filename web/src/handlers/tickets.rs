//! Ticket endpoints.
//!
//! - `POST /api/v1/tickets`: issue a ticket (`service`, `admin`)
//! - `GET /api/v1/tickets/:token`: ticket status (holder, `organizer`, `admin`)
//! - `GET /api/v1/tickets/:token/artifact`: re-rendered QR code (same roles)

use crate::error::AppError;
use crate::extractors::{Caller, CorrelationId};
use crate::state::AppState;
use crate::WebResult;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use gatepass_core::{
    EventId, EventRef, ParticipantMetadata, Role, Ticket, TicketStatus, TicketToken, UserId,
    UserRef,
};
use gatepass_tickets::providers::{TicketNotifier, TicketStore};
use gatepass_tickets::TokenGenerator;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to issue a ticket for a confirmed registration.
#[derive(Debug, Deserialize)]
pub struct IssueTicketRequest {
    /// Event the ticket admits to
    pub event: EventRef,
    /// Ticket holder
    pub user: UserRef,
    /// Display metadata; strings, numbers and booleans are kept as text
    #[serde(default)]
    pub participant: BTreeMap<String, Value>,
}

impl IssueTicketRequest {
    /// Flatten the participant object into metadata.
    ///
    /// `null` fields are dropped.
    ///
    /// # Errors
    ///
    /// Returns `422` if a field is an array or an object.
    pub fn participant_metadata(&self) -> WebResult<ParticipantMetadata> {
        self.participant
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| match value {
                Value::String(text) => Ok((key.clone(), text.clone())),
                Value::Number(_) | Value::Bool(_) => Ok((key.clone(), value.to_string())),
                Value::Array(_) | Value::Object(_) | Value::Null => Err(AppError::validation(
                    format!("participant.{key} must be a string, number or boolean"),
                )),
            })
            .collect()
    }
}

/// Ticket as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct TicketView {
    /// Ticket token
    pub token: TicketToken,
    /// Event the ticket admits to
    pub event_id: EventId,
    /// Event display name
    pub event_name: String,
    /// Ticket holder
    pub user_id: UserId,
    /// Participant metadata
    pub participant: ParticipantMetadata,
    /// Name shown to the door operator
    pub participant_display: String,
    /// `issued` or `redeemed`
    pub status: TicketStatus,
    /// Issuance time
    pub issued_at: DateTime<Utc>,
    /// Redemption time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redeemed_at: Option<DateTime<Utc>>,
    /// Operator who redeemed the ticket
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redeemed_by: Option<UserId>,
}

impl From<&Ticket> for TicketView {
    fn from(ticket: &Ticket) -> Self {
        Self {
            token: ticket.token.clone(),
            event_id: ticket.event_id.clone(),
            event_name: ticket.event_name.clone(),
            user_id: ticket.user_id.clone(),
            participant: ticket.participant.clone(),
            participant_display: ticket.participant.display_name().to_string(),
            status: ticket.status,
            issued_at: ticket.issued_at,
            redeemed_at: ticket.redeemed_at,
            redeemed_by: ticket.redeemed_by.clone(),
        }
    }
}

/// Response after issuing a ticket.
#[derive(Debug, Serialize)]
pub struct IssuedTicketResponse {
    /// The persisted ticket
    #[serde(flatten)]
    pub ticket: TicketView,
    /// PNG QR code as a `data:image/png;base64,` URI
    pub artifact: String,
}

/// Re-rendered artifact of an existing ticket.
#[derive(Debug, Serialize)]
pub struct ArtifactResponse {
    /// Ticket token
    pub token: TicketToken,
    /// PNG QR code as a `data:image/png;base64,` URI
    pub artifact: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// Issue a ticket.
///
/// Every call issues a new, independent ticket; the registration layer is
/// responsible for not calling twice for one registration.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/v1/tickets \
///   -H "X-Gatepass-User-Id: registration" \
///   -H "X-Gatepass-Role: service" \
///   -H "Content-Type: application/json" \
///   -d '{
///     "event": {"id": "evt-rustconf-2025", "name": "RustConf 2025"},
///     "user": {"id": "user-ada"},
///     "participant": {"name": "Ada Lovelace", "email": "ada@example.com"}
///   }'
/// ```
///
/// # Errors
///
/// - `403` unless the caller is `service` or `admin`
/// - `422` for nested participant fields or a payload too large for a QR code
/// - `503 TRY_AGAIN` if the store stayed unavailable through every retry
pub async fn issue_ticket<S, G, N>(
    State(state): State<AppState<S, G, N>>,
    correlation_id: CorrelationId,
    caller: Caller,
    Json(request): Json<IssueTicketRequest>,
) -> WebResult<(StatusCode, Json<IssuedTicketResponse>)>
where
    S: TicketStore + Clone,
    G: TokenGenerator + Clone,
    N: TicketNotifier + Clone,
{
    let issuer = caller.require(Role::can_issue, "issue tickets")?;
    let participant = request.participant_metadata()?;

    tracing::debug!(
        correlation_id = %correlation_id.0,
        issuer = %issuer.id,
        event_id = %request.event.id,
        user_id = %request.user.id,
        "Issuing ticket"
    );

    let issued = state
        .issuance
        .issue(participant, &request.event, &request.user)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(IssuedTicketResponse {
            ticket: TicketView::from(&issued.ticket),
            artifact: issued.artifact.data_uri(),
        }),
    ))
}

/// Read a ticket's status.
///
/// Tickets held by someone else are reported as not found to callers who may
/// not read them.
///
/// # Errors
///
/// - `404` if no ticket has this token or the caller may not see it
/// - `503 TRY_AGAIN` if the store is unavailable
pub async fn get_ticket<S, G, N>(
    State(state): State<AppState<S, G, N>>,
    caller: Caller,
    Path(token): Path<String>,
) -> WebResult<Json<TicketView>>
where
    S: TicketStore + Clone,
    G: TokenGenerator + Clone,
    N: TicketNotifier + Clone,
{
    let token = TicketToken::new(token);

    let ticket = state
        .validation
        .ticket_status(&token)
        .await?
        .filter(|ticket| caller.can_view(&ticket.user_id))
        .ok_or_else(|| AppError::not_found("Ticket", token.fingerprint()))?;

    Ok(Json(TicketView::from(&ticket)))
}

/// Re-render a ticket's QR code.
///
/// The image is byte-identical to the one returned at issuance.
///
/// # Errors
///
/// - `404` if no ticket has this token or the caller may not see it
/// - `503 TRY_AGAIN` if the store is unavailable
pub async fn get_artifact<S, G, N>(
    State(state): State<AppState<S, G, N>>,
    caller: Caller,
    Path(token): Path<String>,
) -> WebResult<Json<ArtifactResponse>>
where
    S: TicketStore + Clone,
    G: TokenGenerator + Clone,
    N: TicketNotifier + Clone,
{
    let token = TicketToken::new(token);

    let issued = state
        .issuance
        .reissue_artifact(&token)
        .await?
        .filter(|issued| caller.can_view(&issued.ticket.user_id))
        .ok_or_else(|| AppError::not_found("Ticket", token.fingerprint()))?;

    Ok(Json(ArtifactResponse {
        token: issued.ticket.token,
        artifact: issued.artifact.data_uri(),
    }))
}
