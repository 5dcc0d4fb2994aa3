//! Error types for web handlers.
//!
//! Bridges [`TicketError`] and request-level failures to HTTP responses.
//! Scan rejections never pass through here; they are successful responses
//! carrying `accepted: false`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use gatepass_tickets::TicketError;
use serde::Serialize;
use std::fmt;

/// Application error type for web handlers.
///
/// # Examples
///
/// ```ignore
/// async fn handler(State(state): State<AppState<S, G, N>>) -> WebResult<Json<TicketView>> {
///     let ticket = state.validation.ticket_status(&token).await?
///         .ok_or_else(|| AppError::not_found("Ticket", token.fingerprint()))?;
///     Ok(Json(TicketView::from(&ticket)))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: String,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: String) -> Self {
        Self {
            status,
            message,
            code,
            source: None,
        }
    }

    /// Create a new error with a source error.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// HTTP status of the response.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            message.into(),
            "UNAUTHORIZED".to_string(),
        )
    }

    /// Create a 403 Forbidden error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            message.into(),
            "FORBIDDEN".to_string(),
        )
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("{resource} {id} not found"),
            "NOT_FOUND".to_string(),
        )
    }

    /// Create a 422 Unprocessable Entity error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            message.into(),
            "VALIDATION_ERROR".to_string(),
        )
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR".to_string(),
        )
    }

    /// Create a 503 error telling the client to retry the same request.
    #[must_use]
    pub fn try_again(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            message.into(),
            "TRY_AGAIN".to_string(),
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: String,
    /// Human-readable error message.
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "Request failed"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Request failed"
                );
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}

/// Storage trouble is retryable by the client; the ticket was left untouched.
impl From<TicketError> for AppError {
    fn from(err: TicketError) -> Self {
        let app_error = match &err {
            TicketError::StorageUnavailable { .. } => {
                Self::try_again("Ticket storage is unavailable, please try again")
            }
            TicketError::Encoding { .. } => {
                Self::validation("Ticket payload is too large to encode as a QR code")
            }
            TicketError::EntropySource(_)
            | TicketError::Notification(_)
            | TicketError::DuplicateToken { .. }
            | TicketError::InvalidTransition { .. }
            | TicketError::Serialization(_) => Self::internal("An internal error occurred"),
        };
        app_error.with_source(anyhow::Error::new(err))
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::forbidden("Role participant may not scan tickets");
        assert_eq!(err.to_string(), "[FORBIDDEN] Role participant may not scan tickets");
    }

    #[test]
    fn test_not_found() {
        let err = AppError::not_found("Ticket", "abcd1234");
        assert_eq!(err.to_string(), "[NOT_FOUND] Ticket abcd1234 not found");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_storage_failure_is_try_again() {
        let err = AppError::from(TicketError::storage("find", "connection reset"));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.code(), "TRY_AGAIN");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_encoding_failure_is_unprocessable() {
        let err = AppError::from(TicketError::Encoding {
            payload_len: 4000,
            reason: "data too long".into(),
        });
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_other_failures_are_internal() {
        let err = AppError::from(TicketError::EntropySource("no entropy".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.to_string().contains("entropy"));
    }
}
