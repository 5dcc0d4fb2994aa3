//! Ticket system configuration.
//!
//! Values are supplied by the process entry point; the defaults here are the
//! ones a single-node deployment runs with.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Configuration shared by issuance and validation.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketConfig {
    /// Upper bound for any single store call.
    ///
    /// Default: 2 seconds
    pub storage_timeout: Duration,

    /// Retry schedule for issuance when persistence fails transiently.
    pub issuance_retry: RetryPolicy,

    /// QR rendering settings.
    pub qr: QrSettings,
}

impl TicketConfig {
    /// Set the storage timeout.
    #[must_use]
    pub const fn with_storage_timeout(mut self, timeout: Duration) -> Self {
        self.storage_timeout = timeout;
        self
    }

    /// Set the issuance retry policy.
    #[must_use]
    pub const fn with_issuance_retry(mut self, policy: RetryPolicy) -> Self {
        self.issuance_retry = policy;
        self
    }

    /// Set the QR rendering settings.
    #[must_use]
    pub const fn with_qr(mut self, qr: QrSettings) -> Self {
        self.qr = qr;
        self
    }
}

impl Default for TicketConfig {
    fn default() -> Self {
        Self {
            storage_timeout: Duration::from_secs(2),
            issuance_retry: RetryPolicy::default(),
            qr: QrSettings::default(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Retry policy
// ═══════════════════════════════════════════════════════════════════════

/// Exponential backoff for issuance retries.
///
/// # Default Values
///
/// - `max_attempts`: 3 (the first try included)
/// - `initial_delay`: 50ms
/// - `max_delay`: 1 second
/// - `multiplier`: 2.0
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total number of attempts, the first one included. Zero behaves as one.
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Cap for the exponential backoff
    pub max_delay: Duration,
    /// Backoff multiplier
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(1),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set the total number of attempts.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the delay before the first retry.
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Delay before retry number `retry` (0-based).
    ///
    /// `initial_delay * multiplier^retry`, capped at `max_delay`.
    ///
    /// # Examples
    ///
    /// ```
    /// use gatepass_tickets::config::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::default();
    /// assert_eq!(policy.delay_for_retry(0), Duration::from_millis(50));
    /// assert_eq!(policy.delay_for_retry(1), Duration::from_millis(100));
    /// assert_eq!(policy.delay_for_retry(10), Duration::from_secs(1));
    /// ```
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let nanos = (self.initial_delay.as_nanos() as f64 * self.multiplier.powi(exponent)).round();

        if !nanos.is_finite() || nanos >= self.max_delay.as_nanos() as f64 {
            return self.max_delay;
        }

        Duration::from_nanos(nanos.max(0.0) as u64)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// QR settings
// ═══════════════════════════════════════════════════════════════════════

/// Error returned when parsing an unknown error-correction level.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown QR error-correction level: {0} (expected L, M, Q or H)")]
pub struct UnknownErrorCorrection(pub String);

/// QR error-correction level. Higher levels survive more damage but hold
/// less data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QrErrorCorrection {
    /// ~7% recovery
    Low,
    /// ~15% recovery
    #[default]
    Medium,
    /// ~25% recovery
    Quartile,
    /// ~30% recovery
    High,
}

impl fmt::Display for QrErrorCorrection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Self::Low => "L",
            Self::Medium => "M",
            Self::Quartile => "Q",
            Self::High => "H",
        };
        f.write_str(letter)
    }
}

impl FromStr for QrErrorCorrection {
    type Err = UnknownErrorCorrection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "L" => Ok(Self::Low),
            "M" => Ok(Self::Medium),
            "Q" => Ok(Self::Quartile),
            "H" => Ok(Self::High),
            _ => Err(UnknownErrorCorrection(s.to_string())),
        }
    }
}

/// Settings for the QR image encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QrSettings {
    /// Error-correction level.
    ///
    /// Default: `M`
    pub error_correction: QrErrorCorrection,

    /// Pixels per QR module, between 1 and
    /// [`MAX_QR_MODULE_SCALE`](crate::constants::MAX_QR_MODULE_SCALE).
    ///
    /// Default: 8
    pub module_scale: u32,

    /// Whether to draw the quiet zone around the symbol.
    ///
    /// Default: `true`
    pub quiet_zone: bool,
}

impl QrSettings {
    /// Set the error-correction level.
    #[must_use]
    pub const fn with_error_correction(mut self, level: QrErrorCorrection) -> Self {
        self.error_correction = level;
        self
    }

    /// Set the module scale in pixels.
    #[must_use]
    pub const fn with_module_scale(mut self, scale: u32) -> Self {
        self.module_scale = scale;
        self
    }

    /// Enable or disable the quiet zone.
    #[must_use]
    pub const fn with_quiet_zone(mut self, quiet_zone: bool) -> Self {
        self.quiet_zone = quiet_zone;
        self
    }
}

impl Default for QrSettings {
    fn default() -> Self {
        Self {
            error_correction: QrErrorCorrection::Medium,
            module_scale: 8,
            quiet_zone: true,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TicketConfig::default();
        assert_eq!(config.storage_timeout, Duration::from_secs(2));
        assert_eq!(config.issuance_retry.max_attempts, 3);
        assert_eq!(config.qr.error_correction, QrErrorCorrection::Medium);
        assert_eq!(config.qr.module_scale, 8);
        assert!(config.qr.quiet_zone);
    }

    #[test]
    fn test_builder_overrides() {
        let config = TicketConfig::default()
            .with_storage_timeout(Duration::from_millis(250))
            .with_issuance_retry(RetryPolicy::no_retry())
            .with_qr(QrSettings::default().with_module_scale(4).with_quiet_zone(false));
        assert_eq!(config.storage_timeout, Duration::from_millis(250));
        assert_eq!(config.issuance_retry.max_attempts, 1);
        assert_eq!(config.qr.module_scale, 4);
        assert!(!config.qr.quiet_zone);
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_retry(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_retry(5), Duration::from_secs(1));
        assert_eq!(policy.delay_for_retry(u32::MAX), Duration::from_secs(1));
    }

    #[test]
    fn test_error_correction_parsing() {
        assert_eq!("h".parse::<QrErrorCorrection>().unwrap(), QrErrorCorrection::High);
        assert_eq!(" Q ".parse::<QrErrorCorrection>().unwrap(), QrErrorCorrection::Quartile);
        assert!("X".parse::<QrErrorCorrection>().is_err());
        assert_eq!(QrErrorCorrection::Low.to_string(), "L");
    }
}
