//! Ticket issuance.
//!
//! Turns a confirmed registration into a persisted ticket and its scannable
//! artifact:
//!
//! ```text
//! generate token → encode payload → render QR → persist → notify
//!        ▲                                         │
//!        └──── retryable failure, fresh token ─────┘
//! ```
//!
//! A token is never reused after a failed insert. Entropy and encoding
//! failures are fatal; only storage unavailability and token collisions are
//! retried.

use crate::artifact::{TicketArtifact, TicketImageEncoder};
use crate::config::TicketConfig;
use crate::constants::operations;
use crate::environment::{TicketEnvironment, bounded};
use crate::error::Result;
use crate::metrics::TicketMetrics;
use crate::payload::{PayloadCodec, TicketPayload};
use crate::providers::{TicketNotifier, TicketStore};
use crate::token::TokenGenerator;
use gatepass_core::{Clock, EventRef, ParticipantMetadata, Ticket, TicketToken, UserRef};
use tracing::{error, info, warn};

/// A persisted ticket with its payload text and rendered artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedTicket {
    /// The persisted record.
    pub ticket: Ticket,
    /// Text embedded in the QR code.
    pub payload: String,
    /// Rendered QR code.
    pub artifact: TicketArtifact,
}

/// Issues tickets.
#[derive(Clone)]
pub struct IssuanceService<S, G, N>
where
    S: TicketStore + Clone,
    G: TokenGenerator + Clone,
    N: TicketNotifier + Clone,
{
    env: TicketEnvironment<S, G, N>,
    encoder: TicketImageEncoder,
    config: TicketConfig,
}

impl<S, G, N> IssuanceService<S, G, N>
where
    S: TicketStore + Clone,
    G: TokenGenerator + Clone,
    N: TicketNotifier + Clone,
{
    /// Create an issuance service.
    #[must_use]
    pub fn new(env: TicketEnvironment<S, G, N>, config: TicketConfig) -> Self {
        Self {
            env,
            encoder: TicketImageEncoder::new(config.qr),
            config,
        }
    }

    /// Issue a ticket for `user` to `event`.
    ///
    /// Every call yields a fresh token; issuing twice for the same user and
    /// event gives two independent tickets. Participant metadata may be
    /// partial or empty. A notifier failure is logged and does not undo
    /// issuance.
    ///
    /// # Errors
    ///
    /// - `EntropySource` if no secure token can be drawn
    /// - `Encoding` if the payload does not fit a QR symbol
    /// - `StorageUnavailable` or `DuplicateToken` once the retry policy is
    ///   exhausted
    pub async fn issue(
        &self,
        participant: ParticipantMetadata,
        event: &EventRef,
        user: &UserRef,
    ) -> Result<IssuedTicket> {
        let policy = &self.config.issuance_retry;
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt: u32 = 0;

        let issued = loop {
            attempt += 1;

            match self.attempt(participant.clone(), event, user).await {
                Ok(issued) => break issued,
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = policy.delay_for_retry(attempt - 1);
                    warn!(
                        event_id = %event.id,
                        user_id = %user.id,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "Ticket persistence failed, retrying with a fresh token"
                    );
                    TicketMetrics::record_issuance_retry();
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!(
                        event_id = %event.id,
                        user_id = %user.id,
                        attempt,
                        error = %e,
                        "Ticket issuance failed"
                    );
                    return Err(e);
                }
            }
        };

        if let Err(e) = self
            .env
            .notifier
            .ticket_issued(&issued.ticket, &issued.artifact)
            .await
        {
            warn!(
                token = %issued.ticket.token.fingerprint(),
                error = %e,
                "Ticket issued but notification failed"
            );
        }

        TicketMetrics::record_issued();
        info!(
            token = %issued.ticket.token.fingerprint(),
            event_id = %issued.ticket.event_id,
            user_id = %issued.ticket.user_id,
            attempt,
            "Ticket issued"
        );

        Ok(issued)
    }

    /// Re-render the artifact of an existing ticket.
    ///
    /// The result is byte-identical to the artifact returned at issuance.
    /// Returns `None` if no ticket has this token.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the lookup fails, or `Encoding` if the
    /// stored ticket cannot be rendered with the current settings.
    pub async fn reissue_artifact(&self, token: &TicketToken) -> Result<Option<IssuedTicket>> {
        let ticket = bounded(
            self.config.storage_timeout,
            operations::FIND,
            self.env.store.find_ticket_by_token(token),
        )
        .await?;

        ticket
            .map(|ticket| {
                let (payload, artifact) = self.render(&ticket)?;
                Ok(IssuedTicket {
                    ticket,
                    payload,
                    artifact,
                })
            })
            .transpose()
    }

    async fn attempt(
        &self,
        participant: ParticipantMetadata,
        event: &EventRef,
        user: &UserRef,
    ) -> Result<IssuedTicket> {
        let token = self.env.tokens.generate()?;
        let ticket = Ticket::issue(token, event, user, participant, self.env.clock.now());
        let (payload, artifact) = self.render(&ticket)?;

        bounded(
            self.config.storage_timeout,
            operations::INSERT,
            self.env.store.insert_ticket(&ticket),
        )
        .await?;

        Ok(IssuedTicket {
            ticket,
            payload,
            artifact,
        })
    }

    fn render(&self, ticket: &Ticket) -> Result<(String, TicketArtifact)> {
        let payload = PayloadCodec::encode(&TicketPayload::for_ticket(ticket))?;
        let artifact = self.encoder.render(&payload)?;
        Ok((payload, artifact))
    }
}
