//! Exponential backoff for reconnection

use std::time::Duration;

use dl_core::config::BackoffConfig;

/// Computes the delay before a reconnect attempt.
///
/// `delay(n) = min(base * 2^n, cap)`. The policy holds no counters; the
/// caller passes the attempt number and enforces the attempt ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Base delay
    base: Duration,
    /// Maximum delay
    cap: Duration,
}

impl BackoffPolicy {
    /// Create a policy from configuration
    pub fn from_config(config: &BackoffConfig) -> Self {
        Self::new(config.base, config.cap)
    }

    /// Create a policy with custom parameters
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap }
    }

    /// Delay before attempt number `attempt` (1-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.base.checked_mul(factor))
            .map_or(self.cap, |delay| delay.min(self.cap))
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_config(&BackoffConfig::default())
    }
}
