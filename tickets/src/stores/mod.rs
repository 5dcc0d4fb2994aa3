//! Ticket store implementations.
//!
//! - **In-memory** - single process, development and tests
//! - **Redis** - hash per ticket, Lua scripts for atomic insert and redemption
//! - **PostgreSQL** (feature `postgres`) - conditional `UPDATE` for redemption

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod ticket_redis;

// Re-exports
pub use memory::InMemoryTicketStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresTicketStore;
pub use ticket_redis::RedisTicketStore;
