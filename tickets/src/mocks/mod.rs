//! Mock provider implementations for testing.
//!
//! In-memory, deterministic implementations of the provider traits, with
//! switches to inject the failures the services must survive.

pub mod notifier;
pub mod ticket_store;
pub mod token;

pub use notifier::MockNotifier;
pub use ticket_store::MockTicketStore;
pub use token::MockTokenGenerator;
