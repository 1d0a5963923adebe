//! Retry policy with exponential backoff and jitter
//!
//! Applied to SSH dials and SCP transfers. The loop is blocking and is
//! only ever driven from inside `spawn_blocking`, alongside the libssh2
//! calls it wraps.

use std::time::Duration;

/// Exponential backoff configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts before the last error surfaces
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Growth factor per attempt
    pub backoff_multiplier: f64,
    /// Fraction of the delay randomized away from the midpoint
    pub jitter_factor: f64,
    /// Upper bound on any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(80),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// A policy with a different attempt cap and unchanged delays
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Backoff delay before the given attempt (1-based)
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        // Precision loss acceptable for backoff calculations
        #[allow(clippy::cast_precision_loss)]
        let base = self.initial_delay.as_millis().min(u128::from(u64::MAX)) as f64;
        #[allow(clippy::cast_precision_loss)]
        let max = self.max_delay.as_millis().min(u128::from(u64::MAX)) as f64;

        #[allow(clippy::cast_possible_wrap)]
        let delay = (base * self.backoff_multiplier.powi(attempt as i32 - 1)).min(max);

        let jitter = delay * self.jitter_factor * (rand::random::<f64>() - 0.5);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let millis = (delay + jitter).max(0.0).round() as u64;
        Duration::from_millis(millis)
    }

    /// Run a blocking operation until it succeeds, attempts run out, or
    /// a failure is not worth retrying.
    ///
    /// The closure receives the 1-based attempt number; `retryable`
    /// classifies each failure, and a non-retryable one surfaces
    /// immediately without burning the remaining attempts.
    ///
    /// # Errors
    ///
    /// Returns the final error together with the number of attempts
    /// actually made.
    pub fn run_blocking<T, E, F>(
        &self,
        mut op: F,
        retryable: impl Fn(&E) -> bool,
    ) -> Result<T, (E, u32)>
    where
        F: FnMut(u32) -> Result<T, E>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if attempt >= attempts || !retryable(&err) {
                        return Err((err, attempt));
                    }
                    std::thread::sleep(self.delay_for(attempt));
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow_exponentially_within_bounds() {
        let policy = RetryPolicy {
            jitter_factor: 0.0,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(80));
        assert_eq!(policy.delay_for(2), Duration::from_millis(160));
        assert_eq!(policy.delay_for(3), Duration::from_millis(320));
        // Caps at max_delay
        assert_eq!(policy.delay_for(20), policy.max_delay);
    }

    #[test]
    fn jitter_stays_near_the_midpoint() {
        let policy = RetryPolicy::default();
        for _ in 0..100 {
            let delay = policy.delay_for(2).as_millis();
            assert!((152..=168).contains(&delay), "delay {delay} out of range");
        }
    }

    #[test]
    fn returns_value_on_eventual_success() {
        let policy = RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            ..RetryPolicy::default()
        };
        let mut calls = 0;
        let result: Result<u32, (&str, u32)> = policy.run_blocking(
            |attempt| {
                calls += 1;
                if attempt < 3 {
                    Err("not yet")
                } else {
                    Ok(attempt)
                }
            },
            |_| true,
        );
        assert_eq!(result, Ok(3));
        assert_eq!(calls, 3);
    }

    #[test]
    fn surfaces_last_error_with_attempt_count() {
        let policy = RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            ..RetryPolicy::default()
        };
        let result: Result<(), (String, u32)> = policy
            .run_blocking(|attempt| Err(format!("attempt {attempt} refused")), |_| true);
        let (err, attempts) = result.expect_err("exhausted");
        assert_eq!(attempts, 3);
        assert_eq!(err, "attempt 3 refused");
    }

    #[test]
    fn non_retryable_errors_surface_immediately() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_millis(1),
            ..RetryPolicy::default()
        };
        let mut calls = 0;
        let result: Result<(), (&str, u32)> = policy.run_blocking(
            |_| {
                calls += 1;
                Err("permission denied")
            },
            |_| false,
        );
        let (err, attempts) = result.expect_err("fatal");
        assert_eq!(err, "permission denied");
        assert_eq!(attempts, 1);
        assert_eq!(calls, 1);
    }
}
