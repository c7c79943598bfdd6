//! Rate-limit retry policy.

use chutes_core::TransportConfig;
use std::time::Duration;

/// Status that triggers a retry. Nothing else does.
pub const RATE_LIMITED: u16 = 429;

/// Exponential backoff on HTTP 429 only.
///
/// The delay before retry `n` (0-indexed) is `base_delay * 2^n`, so the
/// default policy sleeps 1s, 2s, 4s before giving up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Whether a response with `status` should be retried after
    /// `retries_so_far` retries.
    pub fn should_retry(&self, status: u16, retries_so_far: u32) -> bool {
        status == RATE_LIMITED && retries_so_far < self.max_retries
    }

    /// Delay before the given retry (0-indexed).
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(retry.min(16)))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&TransportConfig::default())
    }
}

impl From<&TransportConfig> for RetryPolicy {
    fn from(config: &TransportConfig) -> Self {
        Self::new(config.max_retries, config.base_delay())
    }
}
