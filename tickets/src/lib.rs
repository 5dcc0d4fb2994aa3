//! # Gatepass Tickets
//!
//! QR ticket issuance and single-use validation.
//!
//! ## Features
//!
//! - **Unguessable tokens**: 256 bits from the OS CSPRNG
//! - **Deterministic artifacts**: the same ticket always renders the same PNG
//! - **Single admission**: redemption is one atomic conditional update in
//!   the store, so concurrent scans admit exactly once
//! - **Fail closed**: storage failures are errors, never acceptances
//!
//! ## Architecture
//!
//! ```text
//! registration ─▶ IssuanceService ─▶ TokenGenerator ─▶ PayloadCodec ─▶ TicketImageEncoder
//!                        │                                                     │
//!                        ▼                                                     ▼
//!                   TicketStore ◀──── compare-and-set ◀──── ValidationService ◀── scanner
//! ```
//!
//! ## Example
//!
//! ```rust
//! use gatepass_core::{EventContext, EventRef, ParticipantMetadata, Principal, Role, SystemClock, UserRef};
//! use gatepass_tickets::{
//!     IssuanceService, OsTokenGenerator, TicketConfig, TicketEnvironment, ValidationService,
//!     providers::ConsoleNotifier, stores::InMemoryTicketStore,
//! };
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), gatepass_tickets::TicketError> {
//! let store = InMemoryTicketStore::new();
//! let env = TicketEnvironment::new(store.clone(), OsTokenGenerator, ConsoleNotifier, Arc::new(SystemClock));
//! let config = TicketConfig::default();
//!
//! let issuance = IssuanceService::new(env, config.clone());
//! let validation = ValidationService::new(store, Arc::new(SystemClock), config.storage_timeout);
//!
//! let issued = issuance
//!     .issue(
//!         ParticipantMetadata::new().with("name", "Ada"),
//!         &EventRef::new("evt-1", "RustConf"),
//!         &UserRef::new("user-1"),
//!     )
//!     .await?;
//!
//! let door = EventContext::new("evt-1");
//! let staff = Principal::new("staff-1", Role::Organizer);
//! assert!(validation.validate(&issued.payload, &door, &staff).await?.is_accepted());
//! assert!(!validation.validate(&issued.payload, &door, &staff).await?.is_accepted());
//! # Ok(())
//! # }
//! ```

// Public modules
pub mod artifact;
pub mod config;
pub mod constants;
pub mod environment;
pub mod error;
pub mod issuance;
pub mod metrics;
pub mod payload;
pub mod providers;
pub mod stores;
pub mod token;
pub mod validation;

#[cfg(feature = "test-utils")]
pub mod mocks;

// Re-export main types for convenience
pub use artifact::{TicketArtifact, TicketImageEncoder};
pub use config::{QrErrorCorrection, QrSettings, RetryPolicy, TicketConfig};
pub use environment::TicketEnvironment;
pub use error::{Result, TicketError};
pub use issuance::{IssuanceService, IssuedTicket};
pub use payload::{DecodeError, PayloadCodec, ScannedPayload, TicketPayload};
pub use token::{OsTokenGenerator, TokenGenerator};
pub use validation::{OutcomeView, Rejection, ValidationOutcome, ValidationService};
