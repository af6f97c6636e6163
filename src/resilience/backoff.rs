//! Exponential backoff with jitter.
//!
//! Used by the accept loop to ride out transient accept failures (for
//! example running out of file descriptors) without spinning.

use std::time::Duration;
use rand::Rng;

/// Calculate exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

/// Counts consecutive failures and hands out growing delays until a retry
/// limit is hit.
#[derive(Debug, Clone)]
pub struct RetryBackoff {
    base_ms: u64,
    max_ms: u64,
    max_retries: u32,
    failures: u32,
}

impl RetryBackoff {
    pub fn new(base_ms: u64, max_ms: u64, max_retries: u32) -> Self {
        Self {
            base_ms,
            max_ms,
            max_retries,
            failures: 0,
        }
    }

    /// Record a failure. Returns the delay before the next attempt, or `None`
    /// once more than `max_retries` consecutive failures have been seen.
    pub fn next_delay(&mut self) -> Option<Duration> {
        self.failures = self.failures.saturating_add(1);
        if self.failures > self.max_retries {
            return None;
        }
        Some(calculate_backoff(self.failures, self.base_ms, self.max_ms))
    }

    /// Forget previous failures after a success.
    pub fn reset(&mut self) {
        self.failures = 0;
    }

    /// Consecutive failures recorded so far.
    pub fn failures(&self) -> u32 {
        self.failures
    }
}
