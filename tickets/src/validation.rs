//! Ticket validation at the door.
//!
//! # State machine
//!
//! ```text
//! ┌──────────┐  compare-and-set (store)  ┌────────────┐
//! │  Issued  │ ─────────────────────────▶│  Redeemed  │  (terminal)
//! └──────────┘                           └────────────┘
//! ```
//!
//! # Steps
//!
//! 1. Decode the scanned text (malformed → `MalformedQr`, no token →
//!    `MissingToken`)
//! 2. Look the token up (absent → `UnknownTicket`)
//! 3. Check the event (mismatch → `WrongEvent`)
//! 4. Check the status (redeemed → `AlreadyUsed` with when and by whom)
//! 5. Conditionally update `issued → redeemed` in the store
//!
//! Step 5 is the only point of mutual exclusion: N concurrent scans of one
//! fresh ticket give exactly one `Accepted`. Storage failures and timeouts
//! are errors, never rejections and never acceptances.

use crate::constants::operations;
use crate::environment::bounded;
use crate::error::{Result, TicketError};
use crate::metrics::TicketMetrics;
use crate::payload::{DecodeError, PayloadCodec};
use crate::providers::TicketStore;
use chrono::{DateTime, Utc};
use gatepass_core::{
    Clock, EventContext, EventId, ParticipantMetadata, Principal, Ticket, TicketStatus,
    TicketToken, UserId,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

// ═══════════════════════════════════════════════════════════════════════
// Outcomes
// ═══════════════════════════════════════════════════════════════════════

/// Why a scan was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The scanned text is not a ticket payload.
    MalformedQr {
        /// Decoder diagnostic (logged, not shown to the operator)
        reason: String,
    },

    /// The scanned payload carries no token.
    MissingToken,

    /// No ticket has the scanned token.
    UnknownTicket,

    /// The ticket is for another event.
    WrongEvent {
        /// Event the ticket admits to
        ticket_event_id: EventId,
    },

    /// The ticket was already redeemed.
    AlreadyUsed {
        /// When it was redeemed
        previous_redeemed_at: Option<DateTime<Utc>>,
        /// Who redeemed it
        previous_redeemed_by: Option<UserId>,
        /// Participant on the ticket, so the operator can compare faces
        participant: ParticipantMetadata,
    },
}

impl Rejection {
    /// Machine-readable reason.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::MalformedQr { .. } => "malformed_qr",
            Self::MissingToken => "missing_token",
            Self::UnknownTicket => "unknown_ticket",
            Self::WrongEvent { .. } => "wrong_event",
            Self::AlreadyUsed { .. } => "already_used",
        }
    }

    /// Message for the scanning operator.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::MalformedQr { .. } => "This QR code is not a ticket.".to_string(),
            Self::MissingToken => "This QR code does not contain a ticket token.".to_string(),
            Self::UnknownTicket => "Ticket not found.".to_string(),
            Self::WrongEvent { ticket_event_id } => {
                format!("This ticket is for another event ({ticket_event_id}).")
            }
            Self::AlreadyUsed {
                previous_redeemed_at,
                ..
            } => match previous_redeemed_at {
                Some(at) => format!("Ticket already used at {}.", at.format("%Y-%m-%d %H:%M:%S UTC")),
                None => "Ticket already used.".to_string(),
            },
        }
    }

    fn already_used(ticket: &Ticket) -> Self {
        Self::AlreadyUsed {
            previous_redeemed_at: ticket.redeemed_at,
            previous_redeemed_by: ticket.redeemed_by.clone(),
            participant: ticket.participant.clone(),
        }
    }
}

/// Result of validating one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// Entry granted; the ticket is now redeemed.
    Accepted {
        /// The ticket as redeemed by this scan
        ticket: Ticket,
    },
    /// Entry refused.
    Rejected(Rejection),
}

impl ValidationOutcome {
    /// Returns `true` if entry was granted.
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// The rejection, if entry was refused.
    #[must_use]
    pub const fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Accepted { .. } => None,
            Self::Rejected(rejection) => Some(rejection),
        }
    }

    /// Metric label: `accepted` or the rejection reason.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Accepted { .. } => "accepted",
            Self::Rejected(rejection) => rejection.reason(),
        }
    }
}

/// Wire form of a [`ValidationOutcome`] for scanning clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeView {
    /// Whether entry was granted.
    pub accepted: bool,
    /// Rejection reason (`malformed_qr`, `missing_token`, `unknown_ticket`,
    /// `wrong_event`, `already_used`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    /// Operator-facing message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Participant name to display.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant_display: Option<String>,
    /// Event the ticket admits to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<EventId>,
    /// When an already-used ticket was redeemed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_redeemed_at: Option<DateTime<Utc>>,
    /// Who redeemed an already-used ticket.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_redeemed_by: Option<UserId>,
}

impl From<&ValidationOutcome> for OutcomeView {
    fn from(outcome: &ValidationOutcome) -> Self {
        let empty = Self {
            accepted: false,
            reason: None,
            message: None,
            participant_display: None,
            event_id: None,
            previous_redeemed_at: None,
            previous_redeemed_by: None,
        };

        match outcome {
            ValidationOutcome::Accepted { ticket } => Self {
                accepted: true,
                participant_display: Some(ticket.participant.display_name().to_string()),
                event_id: Some(ticket.event_id.clone()),
                ..empty
            },
            ValidationOutcome::Rejected(rejection) => {
                let rejected = Self {
                    reason: Some(rejection.reason()),
                    message: Some(rejection.message()),
                    ..empty
                };
                match rejection {
                    Rejection::WrongEvent { ticket_event_id } => Self {
                        event_id: Some(ticket_event_id.clone()),
                        ..rejected
                    },
                    Rejection::AlreadyUsed {
                        previous_redeemed_at,
                        previous_redeemed_by,
                        participant,
                    } => Self {
                        participant_display: Some(participant.display_name().to_string()),
                        previous_redeemed_at: *previous_redeemed_at,
                        previous_redeemed_by: previous_redeemed_by.clone(),
                        ..rejected
                    },
                    Rejection::MalformedQr { .. }
                    | Rejection::MissingToken
                    | Rejection::UnknownTicket => rejected,
                }
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Service
// ═══════════════════════════════════════════════════════════════════════

/// Validates scanned tickets and performs the single redemption.
#[derive(Clone)]
pub struct ValidationService<S>
where
    S: TicketStore + Clone,
{
    store: S,
    clock: Arc<dyn Clock>,
    storage_timeout: Duration,
}

impl<S> ValidationService<S>
where
    S: TicketStore + Clone,
{
    /// Create a validation service.
    #[must_use]
    pub fn new(store: S, clock: Arc<dyn Clock>, storage_timeout: Duration) -> Self {
        Self {
            store,
            clock,
            storage_timeout,
        }
    }

    /// Validate one scan and, if the ticket is good, redeem it.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the store fails, times out, or leaves
    /// the outcome of the conditional update ambiguous. The ticket is then
    /// untouched or already redeemed by this very scan; a retry is safe.
    pub async fn validate(
        &self,
        scanned_text: &str,
        context: &EventContext,
        validator: &Principal,
    ) -> Result<ValidationOutcome> {
        let started = Instant::now();
        let result = self.run(scanned_text, context, validator).await;

        let label = match &result {
            Ok(outcome) => outcome.label(),
            Err(_) => "error",
        };
        TicketMetrics::record_validation(label, started.elapsed());

        result
    }

    /// Read-only ticket lookup.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the store fails or times out.
    pub async fn ticket_status(&self, token: &TicketToken) -> Result<Option<Ticket>> {
        self.find(token).await
    }

    async fn run(
        &self,
        scanned_text: &str,
        context: &EventContext,
        validator: &Principal,
    ) -> Result<ValidationOutcome> {
        let station = context.station_id.as_deref().unwrap_or("-");

        let scanned = match PayloadCodec::decode(scanned_text) {
            Ok(scanned) => scanned,
            Err(DecodeError::MissingToken) => {
                debug!(event_id = %context.event_id, station, "Scan carries no token");
                return Ok(ValidationOutcome::Rejected(Rejection::MissingToken));
            }
            Err(DecodeError::Malformed(reason)) => {
                debug!(event_id = %context.event_id, station, reason = %reason, "Malformed scan");
                return Ok(ValidationOutcome::Rejected(Rejection::MalformedQr { reason }));
            }
        };
        let token = scanned.token();

        let Some(ticket) = self.find(token).await? else {
            debug!(token = %token.fingerprint(), event_id = %context.event_id, station, "Unknown ticket");
            return Ok(ValidationOutcome::Rejected(Rejection::UnknownTicket));
        };

        if !ticket.admits(&context.event_id) {
            warn!(
                token = %token.fingerprint(),
                event_id = %context.event_id,
                ticket_event_id = %ticket.event_id,
                station,
                "Ticket presented at the wrong event"
            );
            return Ok(ValidationOutcome::Rejected(Rejection::WrongEvent {
                ticket_event_id: ticket.event_id,
            }));
        }

        if ticket.is_redeemed() {
            return Ok(Self::report_already_used(&ticket, station));
        }

        let now = self.clock.now();
        let applied = bounded(
            self.storage_timeout,
            operations::COMPARE_AND_SET,
            self.store.compare_and_set_status(
                token,
                TicketStatus::Issued,
                TicketStatus::Redeemed,
                now,
                &validator.id,
            ),
        )
        .await?;

        if applied {
            // The store applied Issued -> Redeemed, and `ticket` was read as
            // issued, so mirroring the transition locally cannot fail.
            let mut redeemed = ticket;
            let mirrored =
                redeemed.transition(TicketStatus::Issued, TicketStatus::Redeemed, now, &validator.id);
            debug_assert!(mirrored, "ticket read before the update was not issued");
            info!(
                token = %token.fingerprint(),
                event_id = %context.event_id,
                validator = %validator.id,
                station,
                "Ticket accepted"
            );
            return Ok(ValidationOutcome::Accepted { ticket: redeemed });
        }

        // Lost the race: someone redeemed it between our read and our update.
        match self.find(token).await? {
            Some(current) if current.is_redeemed() => Ok(Self::report_already_used(&current, station)),
            _ => Err(TicketError::storage(
                operations::COMPARE_AND_SET,
                "conditional update not applied but ticket still reads as issued",
            )),
        }
    }

    async fn find(&self, token: &TicketToken) -> Result<Option<Ticket>> {
        bounded(
            self.storage_timeout,
            operations::FIND,
            self.store.find_ticket_by_token(token),
        )
        .await
    }

    fn report_already_used(ticket: &Ticket, station: &str) -> ValidationOutcome {
        warn!(
            token = %ticket.token.fingerprint(),
            event_id = %ticket.event_id,
            redeemed_at = ?ticket.redeemed_at,
            redeemed_by = ?ticket.redeemed_by,
            station,
            "Ticket already used"
        );
        ValidationOutcome::Rejected(Rejection::already_used(ticket))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use gatepass_testing::{fixtures, test_clock};

    #[test]
    fn test_accepted_view() {
        let ticket = fixtures::ticket("evt-1", &test_clock());
        let view = OutcomeView::from(&ValidationOutcome::Accepted { ticket });
        assert_eq!(
            serde_json::to_value(&view).unwrap(),
            serde_json::json!({
                "accepted": true,
                "participant_display": "Ada Lovelace",
                "event_id": "evt-1",
            })
        );
    }

    #[test]
    fn test_already_used_view_carries_forensics() {
        let view = OutcomeView::from(&ValidationOutcome::Rejected(Rejection::AlreadyUsed {
            previous_redeemed_at: Some(test_clock().now()),
            previous_redeemed_by: Some(UserId::new("staff-1")),
            participant: ParticipantMetadata::new(),
        }));
        assert_eq!(
            serde_json::to_value(&view).unwrap(),
            serde_json::json!({
                "accepted": false,
                "reason": "already_used",
                "message": "Ticket already used at 2025-01-01 00:00:00 UTC.",
                "participant_display": "Guest",
                "previous_redeemed_at": "2025-01-01T00:00:00Z",
                "previous_redeemed_by": "staff-1",
            })
        );
    }

    #[test]
    fn test_rejection_reasons() {
        let reasons: Vec<_> = [
            Rejection::MalformedQr { reason: String::new() },
            Rejection::MissingToken,
            Rejection::UnknownTicket,
            Rejection::WrongEvent { ticket_event_id: EventId::new("evt-2") },
        ]
        .iter()
        .map(Rejection::reason)
        .collect();
        assert_eq!(reasons, ["malformed_qr", "missing_token", "unknown_ticket", "wrong_event"]);
    }

    #[test]
    fn test_malformed_view_hides_decoder_detail() {
        let view = OutcomeView::from(&ValidationOutcome::Rejected(Rejection::MalformedQr {
            reason: "expected value at line 1 column 2".to_string(),
        }));
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("line 1"));
        assert_eq!(view.reason, Some("malformed_qr"));
    }
}
