//! Error types for ticket issuance and validation.
//!
//! Only infrastructure failures are errors. A scan that is refused because the
//! ticket is unknown, for another event or already used is a
//! [`Rejection`](crate::validation::Rejection), not a [`TicketError`].

use gatepass_core::TicketStatus;
use thiserror::Error;

/// Result type alias for ticket operations.
pub type Result<T> = std::result::Result<T, TicketError>;

/// Infrastructure failures of the ticket system.
///
/// None of these is ever downgraded to a rejection: the caller surfaces them
/// as "try again" and the ticket state is left untouched.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TicketError {
    // ═══════════════════════════════════════════════════════════
    // Issuance Errors
    // ═══════════════════════════════════════════════════════════

    /// The operating system's secure random source is unavailable.
    #[error("Secure random source unavailable: {0}")]
    EntropySource(String),

    /// The payload does not fit in a QR symbol at the configured level.
    #[error("Failed to encode {payload_len}-byte payload as QR: {reason}")]
    Encoding {
        /// Length of the rejected payload in bytes
        payload_len: usize,
        /// Reason reported by the encoder
        reason: String,
    },

    /// The notifier could not deliver the issued ticket.
    #[error("Ticket notification failed: {0}")]
    Notification(String),

    // ═══════════════════════════════════════════════════════════
    // Storage Errors
    // ═══════════════════════════════════════════════════════════

    /// The store failed or did not answer within the storage timeout.
    #[error("Ticket storage unavailable during {operation}: {reason}")]
    StorageUnavailable {
        /// Store operation that failed (`insert`, `find`, `compare_and_set`)
        operation: &'static str,
        /// Underlying failure
        reason: String,
    },

    /// A ticket with the same token already exists.
    #[error("Duplicate ticket token {fingerprint}…")]
    DuplicateToken {
        /// Log-safe token prefix
        fingerprint: String,
    },

    /// A store was asked for a transition other than `issued → redeemed`.
    #[error("Invalid ticket transition {from} → {to}")]
    InvalidTransition {
        /// Expected current status
        from: TicketStatus,
        /// Requested new status
        to: TicketStatus,
    },

    /// A stored record could not be serialized or deserialized.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl TicketError {
    /// Shorthand for [`TicketError::StorageUnavailable`].
    pub fn storage(operation: &'static str, reason: impl ToString) -> Self {
        Self::StorageUnavailable {
            operation,
            reason: reason.to_string(),
        }
    }

    /// Returns `true` if issuance may retry with a fresh token.
    ///
    /// # Examples
    ///
    /// ```
    /// # use gatepass_tickets::TicketError;
    /// assert!(TicketError::storage("insert", "connection reset").is_retryable());
    /// assert!(!TicketError::EntropySource("no entropy".into()).is_retryable());
    /// ```
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StorageUnavailable { .. } | Self::DuplicateToken { .. }
        )
    }

    /// Returns `true` if the failure is in the storage layer.
    #[must_use]
    pub const fn is_storage_failure(&self) -> bool {
        matches!(self, Self::StorageUnavailable { .. })
    }
}

impl From<serde_json::Error> for TicketError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(TicketError::storage("find", "timeout").is_retryable());
        assert!(
            TicketError::DuplicateToken {
                fingerprint: "abcd1234".into()
            }
            .is_retryable()
        );
        assert!(
            !TicketError::Encoding {
                payload_len: 4000,
                reason: "data too long".into()
            }
            .is_retryable()
        );
        assert!(!TicketError::Serialization("eof".into()).is_retryable());
    }

    #[test]
    fn test_storage_error_message_names_operation() {
        let error = TicketError::storage("compare_and_set", "connection refused");
        assert_eq!(
            error.to_string(),
            "Ticket storage unavailable during compare_and_set: connection refused"
        );
        assert!(error.is_storage_failure());
    }
}
