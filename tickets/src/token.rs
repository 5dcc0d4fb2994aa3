//! Ticket token generation.
//!
//! A token is the sole credential proving ticket possession, so it must be
//! unguessable: 256 bits from the operating system's CSPRNG, rendered as
//! lowercase hex. It carries no metadata.

use crate::constants::TOKEN_BYTES;
use crate::error::{Result, TicketError};
use gatepass_core::TicketToken;
use rand::RngCore;
use rand::rngs::OsRng;

/// Source of fresh ticket tokens.
pub trait TokenGenerator: Send + Sync {
    /// Produce a new token.
    ///
    /// Two calls never observably return the same value.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::EntropySource`] if the secure random source is
    /// unavailable. Issuance must not proceed with a weaker token.
    fn generate(&self) -> Result<TicketToken>;
}

/// Production generator backed by [`OsRng`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OsTokenGenerator;

impl TokenGenerator for OsTokenGenerator {
    fn generate(&self) -> Result<TicketToken> {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| TicketError::EntropySource(e.to_string()))?;
        Ok(TicketToken::new(hex::encode(bytes)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_tokens_are_distinct() {
        let generator = OsTokenGenerator;
        let tokens: HashSet<String> = (0..10_000)
            .map(|_| generator.generate().unwrap().into_inner())
            .collect();
        assert_eq!(tokens.len(), 10_000);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_token_is_64_lowercase_hex(_seed in any::<u8>()) {
            let token = OsTokenGenerator.generate().unwrap();
            prop_assert_eq!(token.as_str().len(), 64);
            prop_assert!(token.as_str().chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
        }
    }
}
