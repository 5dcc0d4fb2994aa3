//! # Gatepass Testing
//!
//! Testing utilities shared by the Gatepass crates.
//!
//! This crate provides:
//! - Mock implementations of environment traits ([`FixedClock`])
//! - Fixtures for events, holders, participants and tickets
//! - proptest strategies for domain types
//! - A tracing initializer that writes through the test harness
//!
//! ## Example
//!
//! ```
//! use gatepass_core::Clock;
//! use gatepass_testing::{fixtures, test_clock};
//!
//! let clock = test_clock();
//! let ticket = fixtures::ticket("evt-1", &clock);
//! assert_eq!(ticket.issued_at, clock.now());
//! ```

use chrono::{DateTime, Utc};
use gatepass_core::environment::Clock;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::{Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Returns the same time until [`advance`](Self::advance) is called.
    ///
    /// # Example
    ///
    /// ```
    /// use gatepass_testing::mocks::FixedClock;
    /// use gatepass_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2);
    /// ```
    #[derive(Debug)]
    pub struct FixedClock {
        time: Mutex<DateTime<Utc>>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Mutex::new(time),
            }
        }

        /// Move the clock forward.
        pub fn advance(&self, by: chrono::Duration) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }
    }

    impl Clone for FixedClock {
        fn clone(&self) -> Self {
            Self::new(self.now())
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Ready-made domain values for tests.
pub mod fixtures {
    use super::Clock;
    use gatepass_core::{
        EventContext, EventRef, ParticipantMetadata, Principal, Role, Ticket, TicketToken,
        UserRef,
    };

    /// Event used across fixtures.
    pub const EVENT_ID: &str = "evt-rustconf-2025";

    /// Ticket holder used across fixtures.
    pub const HOLDER_ID: &str = "user-ada";

    /// Scanning operator used across fixtures.
    pub const OPERATOR_ID: &str = "staff-grace";

    /// An event reference with a display name.
    #[must_use]
    pub fn event(id: &str) -> EventRef {
        EventRef::new(id, format!("Event {id}"))
    }

    /// The default ticket holder.
    #[must_use]
    pub fn holder() -> UserRef {
        UserRef::new(HOLDER_ID)
    }

    /// Participant metadata as captured by a typical registration form.
    #[must_use]
    pub fn participant() -> ParticipantMetadata {
        ParticipantMetadata::new()
            .with("name", "Ada Lovelace")
            .with("email", "ada@example.com")
            .with("profession", "Engineer")
    }

    /// A deterministic 64-character hex token derived from `seed`.
    #[must_use]
    pub fn token(seed: u8) -> TicketToken {
        TicketToken::new(format!("{seed:02x}").repeat(32))
    }

    /// A freshly issued ticket for `event_id`, stamped with the clock's time.
    #[must_use]
    pub fn ticket(event_id: &str, clock: &impl Clock) -> Ticket {
        Ticket::issue(token(0xab), &event(event_id), &holder(), participant(), clock.now())
    }

    /// An organizer allowed to scan.
    #[must_use]
    pub fn operator() -> Principal {
        Principal::new(OPERATOR_ID, Role::Organizer)
    }

    /// Scan station context for `event_id`.
    #[must_use]
    pub fn station(event_id: &str) -> EventContext {
        EventContext::new(event_id).at_station("door-1")
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use gatepass_core::{ParticipantMetadata, TicketToken};
    use proptest::prelude::*;

    /// Arbitrary participant metadata, including unicode and empty values.
    pub fn participant_metadata() -> impl Strategy<Value = ParticipantMetadata> {
        prop::collection::btree_map("[a-z_]{1,12}", "\\PC{0,24}", 0..6)
            .prop_map(|fields| fields.into_iter().collect())
    }

    /// Tokens shaped like the production generator's output.
    pub fn hex_token() -> impl Strategy<Value = TicketToken> {
        "[0-9a-f]{64}".prop_map(TicketToken::new)
    }

    /// Arbitrary scanner text: anything a camera might hand over.
    pub fn scanned_text() -> impl Strategy<Value = String> {
        prop_oneof![
            "\\PC{0,64}",
            "[ -~]{0,300}",
            Just(String::new()),
            "\\{[ -~]{0,40}",
        ]
    }
}

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,gatepass=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};
