//! # Gatepass Web
//!
//! Axum HTTP surface for ticket issuance and door scanning.
//!
//! ## Endpoints
//!
//! | Method & path | Roles |
//! |---|---|
//! | `GET /health` | anyone |
//! | `GET /metrics` | anyone |
//! | `POST /api/v1/tickets` | `service`, `admin` |
//! | `GET /api/v1/tickets/:token` | holder, `organizer`, `admin` |
//! | `GET /api/v1/tickets/:token/artifact` | holder, `organizer`, `admin` |
//! | `POST /api/v1/events/:event_id/scans` | `organizer`, `admin` |
//!
//! Identity comes from the trusted `X-Gatepass-User-Id` and `X-Gatepass-Role`
//! headers set by the gateway in front of this service.
//!
//! ## Errors
//!
//! Scan rejections are `200 OK` with `accepted: false`. Infrastructure failures
//! are errors: storage trouble is `503 TRY_AGAIN` and the client may rescan.

#![forbid(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

// Re-export commonly used types
pub use config::{Config, ServerConfig, StoreBackend, StoreConfig};
pub use error::AppError;
pub use extractors::{Caller, CorrelationId, ROLE_HEADER, USER_ID_HEADER};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};
pub use router::build_router;
pub use state::AppState;

/// Result type for web handlers.
pub type WebResult<T> = Result<T, AppError>;
