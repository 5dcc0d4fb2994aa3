//! Ticket domain types.
//!
//! This module defines the persisted [`Ticket`] record and the small value
//! types around it. All types are `Clone` and serializable so stores can
//! persist them and the HTTP layer can render them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Display name used when the participant metadata carries no `name` field.
pub const PLACEHOLDER_NAME: &str = "Guest";

/// Number of token characters that may appear in logs.
const FINGERPRINT_LEN: usize = 8;

// ═══════════════════════════════════════════════════════════════════════
// ID Types
// ═══════════════════════════════════════════════════════════════════════

macro_rules! string_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps an identifier supplied by the upstream identity or registration layer.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrows the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(EventId, "Identifier of the event a ticket admits to.");
string_id!(UserId, "Identifier of a user: a ticket holder or a scanning operator.");

/// Secret redemption token.
///
/// The token is the only credential proving ticket possession. Its `Debug`
/// output is redacted to the [fingerprint](Self::fingerprint) so it never lands
/// in logs by accident; use [`as_str`](Self::as_str) where the full value is
/// genuinely needed (payload encoding, storage keys).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketToken(String);

impl TicketToken {
    /// Wraps a token value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrows the full token value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the token is empty or whitespace only.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Returns the log-safe prefix of the token.
    ///
    /// # Examples
    ///
    /// ```
    /// use gatepass_core::TicketToken;
    ///
    /// let token = TicketToken::new("0123456789abcdef");
    /// assert_eq!(token.fingerprint(), "01234567");
    /// ```
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        match self.0.char_indices().nth(FINGERPRINT_LEN) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }

    /// Consumes the token, returning the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for TicketToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TicketToken({}…)", self.fingerprint())
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Participant metadata
// ═══════════════════════════════════════════════════════════════════════

/// Display fields captured at registration time (name, email, profession, ...).
///
/// Backed by an ordered map so that serialization is deterministic. Missing
/// fields are never an error; display helpers fall back to placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantMetadata(BTreeMap<String, String>);

impl ParticipantMetadata {
    /// Creates empty metadata.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Adds a field, replacing any previous value for the key.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Looks up a field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns `true` when no field was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Name to show the scanning operator, or [`PLACEHOLDER_NAME`].
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.get("name")
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(PLACEHOLDER_NAME)
    }

    /// Email captured at registration, if any.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.get("email").filter(|email| !email.trim().is_empty())
    }
}

impl<K, V> FromIterator<(K, V)> for ParticipantMetadata
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Ticket state machine
// ═══════════════════════════════════════════════════════════════════════

/// Error returned when parsing an unknown ticket status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown ticket status: {0}")]
pub struct UnknownStatus(pub String);

/// Redemption status of a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Issued and not yet used.
    Issued,
    /// Used at the door. Terminal.
    Redeemed,
}

impl TicketStatus {
    /// Returns the wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Issued => "issued",
            Self::Redeemed => "redeemed",
        }
    }

    /// Returns `true` for a state with no outgoing transition.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Redeemed)
    }

    /// Returns `true` if `self → next` is a legal transition.
    ///
    /// The only legal transition is `Issued → Redeemed`.
    ///
    /// # Examples
    ///
    /// ```
    /// use gatepass_core::TicketStatus;
    ///
    /// assert!(TicketStatus::Issued.can_transition_to(TicketStatus::Redeemed));
    /// assert!(!TicketStatus::Redeemed.can_transition_to(TicketStatus::Issued));
    /// assert!(!TicketStatus::Issued.can_transition_to(TicketStatus::Issued));
    /// ```
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!((self, next), (Self::Issued, Self::Redeemed))
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "issued" => Ok(Self::Issued),
            "redeemed" => Ok(Self::Redeemed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Event a ticket is issued for, as supplied by the registration layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRef {
    /// Event identifier.
    pub id: EventId,
    /// Display name, embedded in the payload for operators.
    pub name: String,
}

impl EventRef {
    /// Creates an event reference.
    #[must_use]
    pub fn new(id: impl Into<EventId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Ticket holder, as supplied by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    /// User identifier.
    pub id: UserId,
}

impl UserRef {
    /// Creates a user reference.
    #[must_use]
    pub fn new(id: impl Into<UserId>) -> Self {
        Self { id: id.into() }
    }
}

/// The durable record binding a token to an event, a holder and a status.
///
/// Only issuance creates tickets; only validation changes `status`,
/// `redeemed_at` and `redeemed_by`, and always all three together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Secret redemption token (unique).
    pub token: TicketToken,

    /// Event this ticket admits to.
    pub event_id: EventId,

    /// Event display name captured at issuance.
    pub event_name: String,

    /// Ticket holder.
    pub user_id: UserId,

    /// Participant display fields captured at registration.
    pub participant: ParticipantMetadata,

    /// Redemption status.
    pub status: TicketStatus,

    /// Issuance timestamp.
    pub issued_at: DateTime<Utc>,

    /// When the ticket was redeemed.
    pub redeemed_at: Option<DateTime<Utc>>,

    /// Who redeemed the ticket.
    pub redeemed_by: Option<UserId>,
}

impl Ticket {
    /// Builds a freshly issued ticket.
    #[must_use]
    pub fn issue(
        token: TicketToken,
        event: &EventRef,
        user: &UserRef,
        participant: ParticipantMetadata,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            token,
            event_id: event.id.clone(),
            event_name: event.name.clone(),
            user_id: user.id.clone(),
            participant,
            status: TicketStatus::Issued,
            issued_at,
            redeemed_at: None,
            redeemed_by: None,
        }
    }

    /// Returns `true` once the ticket has been used.
    #[must_use]
    pub const fn is_redeemed(&self) -> bool {
        matches!(self.status, TicketStatus::Redeemed)
    }

    /// Returns `true` if this ticket is for the given event.
    #[must_use]
    pub fn admits(&self, event_id: &EventId) -> bool {
        self.event_id == *event_id
    }

    /// Applies `expected → next` if the current status is `expected` and the
    /// transition is legal.
    ///
    /// Returns `true` when the transition was applied. This is the in-process
    /// building block for a store's compare-and-set; callers must hold
    /// whatever lock makes the check and the write indivisible.
    pub fn transition(
        &mut self,
        expected: TicketStatus,
        next: TicketStatus,
        at: DateTime<Utc>,
        by: &UserId,
    ) -> bool {
        if self.status != expected || !expected.can_transition_to(next) {
            return false;
        }
        self.status = next;
        self.redeemed_at = Some(at);
        self.redeemed_by = Some(by.clone());
        true
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Callers
// ═══════════════════════════════════════════════════════════════════════

/// Error returned when parsing an unknown role.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

/// Role asserted by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Registered attendee.
    Participant,
    /// Event staff; may scan tickets at the door.
    Organizer,
    /// Platform administrator.
    Admin,
    /// Internal caller such as the registration layer.
    Service,
}

impl Role {
    /// Returns the wire name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Participant => "participant",
            Self::Organizer => "organizer",
            Self::Admin => "admin",
            Self::Service => "service",
        }
    }

    /// May this role validate tickets at the door?
    #[must_use]
    pub const fn can_scan(self) -> bool {
        matches!(self, Self::Organizer | Self::Admin)
    }

    /// May this role issue tickets?
    #[must_use]
    pub const fn can_issue(self) -> bool {
        matches!(self, Self::Service | Self::Admin)
    }

    /// May this role read tickets it does not hold?
    #[must_use]
    pub const fn can_view_any_ticket(self) -> bool {
        matches!(self, Self::Organizer | Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "participant" => Ok(Self::Participant),
            "organizer" => Ok(Self::Organizer),
            "admin" => Ok(Self::Admin),
            "service" => Ok(Self::Service),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// Verified caller identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// User identifier.
    pub id: UserId,
    /// Role asserted by the identity provider.
    pub role: Role,
}

impl Principal {
    /// Creates a principal.
    #[must_use]
    pub fn new(id: impl Into<UserId>, role: Role) -> Self {
        Self { id: id.into(), role }
    }
}

/// Scan station context: which event this station admits to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventContext {
    /// Event the station checks entries for.
    pub event_id: EventId,
    /// Optional station label, used only for audit logs.
    pub station_id: Option<String>,
}

impl EventContext {
    /// Creates a context for the given event.
    #[must_use]
    pub fn new(event_id: impl Into<EventId>) -> Self {
        Self {
            event_id: event_id.into(),
            station_id: None,
        }
    }

    /// Labels the scanning station.
    #[must_use]
    pub fn at_station(mut self, station_id: impl Into<String>) -> Self {
        self.station_id = Some(station_id.into());
        self
    }
}
