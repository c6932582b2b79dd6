//! Retry policy for transient LLM failures

use std::time::Duration;

use super::LlmError;

/// Maximum number of retries for transient errors
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Initial backoff delay for retries
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 1000;

/// Bounded exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff: Duration::from_millis(DEFAULT_INITIAL_BACKOFF_MS),
        }
    }
}

impl RetryPolicy {
    /// Policy that gives up after the first failure
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::ZERO,
        }
    }

    /// Backoff before retry number `retry` (1-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_backoff.saturating_mul(factor)
    }

    /// Delay before retry number `retry`, honouring a server-requested wait
    pub fn delay_for(&self, retry: u32, error: &LlmError) -> Duration {
        let backoff = self.backoff(retry);
        error.retry_after().map_or(backoff, |wait| wait.max(backoff))
    }
}
