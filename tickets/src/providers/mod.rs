//! Ticket system providers.
//!
//! Traits for every external dependency of issuance and validation. The
//! services depend on these traits; the process entry point picks concrete
//! implementations:
//!
//! - **Testing**: mocks (in-memory, deterministic, fault injection)
//! - **Development**: in-memory store and console notifier
//! - **Production**: Redis or PostgreSQL store

pub mod console_notifier;
pub mod notifier;
pub mod ticket_store;

pub use console_notifier::ConsoleNotifier;
pub use notifier::TicketNotifier;
pub use ticket_store::TicketStore;
