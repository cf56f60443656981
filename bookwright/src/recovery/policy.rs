//! Retry policy: attempt limits and backoff computation.

use super::FailureKind;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the retry controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum attempts per module (including the first).
    pub max_attempts: u32,
    /// Base wait for rate-limit backoff, doubled per attempt.
    pub base_delay_ms: u64,
    /// Cap on any computed wait.
    pub max_delay_ms: u64,
    /// Short wait recommended for network-class failures.
    pub network_delay_ms: u64,
    /// Whether to jitter computed waits. Off by default so the wait
    /// shown to the user matches the countdown exactly.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 15_000,
            max_delay_ms: 120_000,
            network_delay_ms: 2_000,
            jitter: false,
        }
    }
}

impl RetryPolicy {
    /// Creates the default policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the attempt limit.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the base backoff delay.
    #[must_use]
    pub fn with_base_delay_ms(mut self, delay: u64) -> Self {
        self.base_delay_ms = delay;
        self
    }

    /// Sets the delay cap.
    #[must_use]
    pub fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = delay;
        self
    }

    /// Enables jittered waits.
    #[must_use]
    pub fn with_jitter(mut self) -> Self {
        self.jitter = true;
        self
    }

    /// Returns true if another attempt is allowed after `attempt`
    /// failures (1-based).
    #[must_use]
    pub fn allows_another_attempt(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Computes the recommended wait before retrying.
    ///
    /// Rate limits back off exponentially from the provider-suggested
    /// wait when present, else from the configured base; network
    /// failures get the short constant wait; everything else waits the
    /// base once. All results respect the cap.
    #[must_use]
    pub fn backoff_delay(
        &self,
        kind: FailureKind,
        attempt: u32,
        suggested: Option<Duration>,
    ) -> Duration {
        let millis = match kind {
            FailureKind::RateLimited => {
                let seed = suggested
                    .map_or(self.base_delay_ms, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
                let exponent = attempt.saturating_sub(1).min(16);
                seed.saturating_mul(2u64.saturating_pow(exponent))
            }
            FailureKind::Network => self.network_delay_ms,
            FailureKind::Other => self.base_delay_ms,
        };
        let capped = millis.min(self.max_delay_ms);
        let jittered = if self.jitter && capped > 0 {
            rand::thread_rng().gen_range(capped / 2..=capped)
        } else {
            capped
        };
        Duration::from_millis(jittered)
    }
}
