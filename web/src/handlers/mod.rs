//! HTTP request handlers.
//!
//! Handlers are generic over the ticket store, token generator and notifier so
//! the same router serves the in-memory, `Redis` and `PostgreSQL` backends.

pub mod health;
pub mod scans;
pub mod tickets;

pub use health::{health_check, metrics};
pub use scans::{ScanRequest, scan_ticket};
pub use tickets::{
    ArtifactResponse, IssueTicketRequest, IssuedTicketResponse, TicketView, get_artifact,
    get_ticket, issue_ticket,
};
