//! Custom Axum extractors.
//!
//! - `CorrelationId`: the request's correlation ID
//! - `Caller`: the verified identity asserted by the gateway
//!
//! # Examples
//!
//! ```ignore
//! async fn handler(correlation_id: CorrelationId, Caller(caller): Caller) -> WebResult<String> {
//!     tracing::info!(correlation_id = %correlation_id.0, user_id = %caller.id, "Processing request");
//!     Ok(caller.role.to_string())
//! }
//! ```

use crate::error::AppError;
use crate::middleware::CORRELATION_ID_HEADER;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use gatepass_core::{Principal, Role, UnknownRole, UserId};
use uuid::Uuid;

/// Header carrying the caller's user ID.
pub const USER_ID_HEADER: &str = "X-Gatepass-User-Id";

/// Header carrying the caller's role.
pub const ROLE_HEADER: &str = "X-Gatepass-Role";

/// Correlation ID for request tracing.
///
/// Taken from the value stored by
/// [`correlation_id_layer`](crate::middleware::correlation_id_layer), then the
/// `X-Correlation-ID` header, or a new UUID v4.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<Uuid>() {
            return Ok(Self(*id));
        }

        let correlation_id = parts
            .headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

/// Authenticated caller.
///
/// Built from [`USER_ID_HEADER`] and [`ROLE_HEADER`]. A missing, blank or
/// unrecognized value is rejected with `401 Unauthorized`.
#[derive(Debug, Clone)]
pub struct Caller(pub Principal);

impl Caller {
    /// Fail with `403 Forbidden` unless `permitted` holds for the caller's role.
    ///
    /// # Errors
    ///
    /// Returns `AppError::forbidden` naming the refused `action`.
    pub fn require(&self, permitted: fn(Role) -> bool, action: &str) -> Result<&Principal, AppError> {
        if permitted(self.0.role) {
            Ok(&self.0)
        } else {
            Err(AppError::forbidden(format!(
                "Role {} may not {action}",
                self.0.role
            )))
        }
    }

    /// Whether the caller holds the ticket or may read any ticket.
    #[must_use]
    pub fn can_view(&self, holder: &UserId) -> bool {
        self.0.role.can_view_any_ticket() || &self.0.id == holder
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header_value(parts, USER_ID_HEADER)
            .ok_or_else(|| AppError::unauthorized(format!("Missing {USER_ID_HEADER} header")))?;

        let role = header_value(parts, ROLE_HEADER)
            .ok_or_else(|| AppError::unauthorized(format!("Missing {ROLE_HEADER} header")))?
            .parse::<Role>()
            .map_err(|UnknownRole(role)| AppError::unauthorized(format!("Unknown role {role:?}")))?;

        Ok(Self(Principal::new(user_id, role)))
    }
}

fn header_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
