use std::time::Duration;

use artifact_core::{RetrySettings, UploadError};

/// Retry budget and exponential backoff for a single artifact's upload attempts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether another attempt follows the `attempt`-th (1-based) failure.
    pub fn should_retry(&self, attempt: u32, error: &UploadError) -> bool {
        error.is_transient() && attempt < self.max_attempts
    }

    /// Delay after the `attempt`-th failure: base, 2×base, 4×base, ... capped at the maximum.
    #[inline]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1_u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        RetryPolicy::new(settings.max_attempts, settings.base_delay, settings.max_delay)
    }
}
