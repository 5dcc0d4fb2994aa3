//! Mock token generator.

use crate::error::{Result, TicketError};
use crate::token::TokenGenerator;
use gatepass_core::TicketToken;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Default)]
struct State {
    counter: u64,
    scripted: VecDeque<TicketToken>,
    failing: bool,
    generated: Vec<TicketToken>,
}

/// Deterministic token generator.
///
/// Hands out scripted tokens first, then 64-character hex tokens from a
/// counter. Can simulate an unavailable entropy source.
#[derive(Debug, Clone, Default)]
pub struct MockTokenGenerator {
    state: Arc<Mutex<State>>,
}

impl MockTokenGenerator {
    /// Create a generator producing counter tokens.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a generator that hands out `tokens` before counter tokens.
    #[must_use]
    pub fn with_tokens(tokens: impl IntoIterator<Item = TicketToken>) -> Self {
        let generator = Self::new();
        generator.lock().scripted.extend(tokens);
        generator
    }

    /// Simulate an unavailable entropy source.
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    /// Every token handed out so far.
    #[must_use]
    pub fn generated(&self) -> Vec<TicketToken> {
        self.lock().generated.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TokenGenerator for MockTokenGenerator {
    fn generate(&self) -> Result<TicketToken> {
        let mut state = self.lock();

        if state.failing {
            return Err(TicketError::EntropySource(
                "mock entropy source unavailable".to_string(),
            ));
        }

        let token = match state.scripted.pop_front() {
            Some(token) => token,
            None => {
                state.counter += 1;
                TicketToken::new(format!("{:064x}", state.counter))
            }
        };
        state.generated.push(token.clone());
        Ok(token)
    }
}
