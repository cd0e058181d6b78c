use std::time::Duration;

use crate::contract::ValidationError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(30);
pub const DEFAULT_BACKOFF_MULTIPLIER: u32 = 2;

/// Exponential backoff: the wait after failed attempt `n` is
/// `initial_delay * multiplier^(n-1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_INITIAL_DELAY,
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl BackoffPolicy {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_attempts == 0 {
            return Err(ValidationError::new(
                "max_attempts must be a positive integer",
            ));
        }
        if self.multiplier == 0 {
            return Err(ValidationError::new("multiplier must be a positive integer"));
        }
        Ok(())
    }

    pub fn delay_after_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        self.initial_delay
            .saturating_mul(self.multiplier.saturating_pow(exponent))
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct RetryOutcome<T, E> {
    pub result: Result<T, E>,
    pub attempts: u32,
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or the
/// attempt budget is spent. `wait` is called with `(failed_attempt, delay)`
/// before each retry and is responsible for the actual delay.
pub fn retry_with_backoff<T, E>(
    policy: &BackoffPolicy,
    is_retryable: impl Fn(&E) -> bool,
    mut wait: impl FnMut(u32, Duration),
    mut operation: impl FnMut(u32) -> Result<T, E>,
) -> RetryOutcome<T, E> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation(attempt) {
            Ok(value) => {
                return RetryOutcome {
                    result: Ok(value),
                    attempts: attempt,
                }
            }
            Err(error) if attempt < max_attempts && is_retryable(&error) => {
                wait(attempt, policy.delay_after_attempt(attempt));
                attempt += 1;
            }
            Err(error) => {
                return RetryOutcome {
                    result: Err(error),
                    attempts: attempt,
                }
            }
        }
    }
}
