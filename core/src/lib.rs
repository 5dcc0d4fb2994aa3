//! # Gatepass Core
//!
//! Domain types and environment traits shared by every Gatepass crate.
//!
//! A Gatepass ticket binds an unguessable token to one event and one holder.
//! It is created once, at issuance, and redeemed at most once, at the door:
//!
//! ```text
//!   issue()                      validate()
//! ─────────▶ ┌──────────┐  compare-and-set  ┌────────────┐
//!            │  Issued  │ ────────────────▶ │  Redeemed  │  (terminal)
//!            └──────────┘                   └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`ticket`]: the persisted [`Ticket`] record, its [`TicketStatus`] state
//!   machine, identifiers and participant metadata
//! - [`environment`]: injected dependencies such as the [`Clock`]
//!
//! Everything that performs I/O lives in `gatepass-tickets`; this crate is pure
//! data and traits.

pub mod ticket;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use environment::{Clock, SystemClock};
pub use ticket::{
    EventContext, EventId, EventRef, ParticipantMetadata, Principal, Role, Ticket,
    TicketStatus, TicketToken, UnknownRole, UnknownStatus, UserId, UserRef,
};

/// Environment module - dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// by the process entry point, never reached through globals.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use gatepass_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let before = clock.now();
    /// assert!(clock.now() >= before);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
