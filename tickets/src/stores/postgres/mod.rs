//! `PostgreSQL` storage implementations.

pub mod ticket;

// Re-exports
pub use ticket::PostgresTicketStore;
