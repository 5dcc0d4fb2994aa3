//! Ticket metrics.
//!
//! Recording goes through the `metrics` facade. Nothing is exported until the
//! process installs a recorder (the server installs a Prometheus one); until
//! then every call is a no-op.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Duration;

/// Issued tickets.
pub const TICKETS_ISSUED: &str = "gatepass_tickets_issued_total";
/// Issuance attempts retried after a transient persistence failure.
pub const ISSUANCE_RETRIES: &str = "gatepass_issuance_retries_total";
/// Validations by outcome.
pub const VALIDATIONS: &str = "gatepass_validations_total";
/// Storage failures and timeouts by operation.
pub const STORAGE_FAILURES: &str = "gatepass_storage_failures_total";
/// End-to-end validation latency.
pub const VALIDATION_DURATION: &str = "gatepass_validation_duration_seconds";

/// Register all metric descriptions.
pub fn describe_metrics() {
    describe_counter!(TICKETS_ISSUED, "Total number of tickets issued");
    describe_counter!(
        ISSUANCE_RETRIES,
        "Total number of issuance attempts retried with a fresh token"
    );
    describe_counter!(
        VALIDATIONS,
        "Total number of ticket validations, labelled by outcome"
    );
    describe_counter!(
        STORAGE_FAILURES,
        "Total number of ticket store failures and timeouts, labelled by operation"
    );
    describe_histogram!(VALIDATION_DURATION, "Time taken to validate a scanned ticket");
}

/// Ticket metrics recorder.
pub struct TicketMetrics;

impl TicketMetrics {
    /// Record an issued ticket.
    pub fn record_issued() {
        counter!(TICKETS_ISSUED).increment(1);
    }

    /// Record an issuance retry.
    pub fn record_issuance_retry() {
        counter!(ISSUANCE_RETRIES).increment(1);
    }

    /// Record a finished validation.
    pub fn record_validation(outcome: &'static str, duration: Duration) {
        counter!(VALIDATIONS, "outcome" => outcome).increment(1);
        histogram!(VALIDATION_DURATION).record(duration.as_secs_f64());
    }

    /// Record a failed or timed-out store call.
    pub fn record_storage_failure(operation: &'static str) {
        counter!(STORAGE_FAILURES, "operation" => operation).increment(1);
    }
}
