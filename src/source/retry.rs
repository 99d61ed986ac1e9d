//! Retry policy for candidate fetches.
//!
//! One policy shared by every provider, instead of the inline retry loops
//! with magic sleep constants the old per-script fetchers carried.

use std::time::Duration;

/// Retry configuration for a single candidate.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Max attempts per candidate (>= 1).
    pub max_attempts: u32,
    /// Base backoff delay; attempt `n` waits `base * n`.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay before retrying after failed attempt `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_increases() {
        let policy = RetryPolicy::new(4, Duration::from_millis(100));
        assert_eq!(policy.delay(1), Duration::from_millis(100));
        assert_eq!(policy.delay(2), Duration::from_millis(200));
        assert_eq!(policy.delay(3), Duration::from_millis(300));
    }

    #[test]
    fn test_min_one_attempt() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        assert_eq!(policy.max_attempts, 1);
    }
}
