//! Retry schedule for eval cases
//!
//! Exponential backoff without jitter: the delay before retry `n` (0-based)
//! is `base * multiplier^n`.

use std::time::Duration;

/// How often and how patiently a case is retried
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Growth factor per retry
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(1_000),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay_ms: u64, multiplier: f64) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_millis(base_delay_ms),
            multiplier,
        }
    }

    /// Single attempt, no waiting
    pub fn none() -> Self {
        Self::new(0, 0, 1.0)
    }

    /// Total attempts including the first
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Delay after the failed attempt with the given 0-based index
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let multiplier = if self.multiplier.is_finite() && self.multiplier > 0.0 {
            self.multiplier
        } else {
            1.0
        };
        let factor = multiplier.powi(attempt as i32);
        let millis = (self.base_delay.as_millis() as f64 * factor).round();
        if millis.is_finite() && millis < u64::MAX as f64 {
            Duration::from_millis(millis.max(0.0) as u64)
        } else {
            Duration::from_millis(u64::MAX)
        }
    }

    /// Delays between consecutive attempts, in order
    pub fn schedule(&self) -> Vec<Duration> {
        (0..self.max_retries)
            .map(|attempt| self.delay_for_attempt(attempt))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_schedule() {
        let policy = RetryPolicy::new(3, 100, 2.0);
        assert_eq!(policy.max_attempts(), 4);
        assert_eq!(
            policy.schedule(),
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400)
            ]
        );
    }

    #[test]
    fn test_schedule_non_decreasing() {
        for multiplier in [1.0, 1.5, 2.0, 3.0] {
            let schedule = RetryPolicy::new(5, 10, multiplier).schedule();
            assert!(schedule.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn test_degenerate_multiplier() {
        let policy = RetryPolicy::new(2, 50, f64::NAN);
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(50));
        assert!(RetryPolicy::none().schedule().is_empty());
    }
}
