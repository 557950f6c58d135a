//! Service-layer configuration.

use std::time::Duration;

/// Configuration for [`crate::OrderService`].
#[derive(Debug, Clone)]
pub struct OrderConfig {
    /// How many times a batch is re-read and re-committed after the
    /// store refuses a stock guard or reports a write conflict
    /// (default: 3).
    pub max_commit_attempts: u32,
    /// Wait before the first retry (default: 10ms). Doubles per attempt.
    pub initial_retry_delay: Duration,
    /// Upper bound on the wait between attempts (default: 200ms).
    pub max_retry_delay: Duration,
}

impl OrderConfig {
    /// Delay after failed attempt number `attempt` (1-based).
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_retry_delay
            .saturating_mul(factor)
            .min(self.max_retry_delay)
    }
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self {
            max_commit_attempts: 3,
            initial_retry_delay: Duration::from_millis(10),
            max_retry_delay: Duration::from_millis(200),
        }
    }
}
