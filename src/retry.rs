//! Retry policies for transient failures.
//!
//! A [`Retryer`] is stateful: the pipeline clones the configured prototype
//! with [`Retryer::for_call`] at the start of every invocation, so attempt
//! counts are never shared between concurrent calls.

use crate::error::Error;
use std::time::Duration;

/// Decides whether a retryable error gets another attempt.
pub trait Retryer: Send + Sync {
    /// If retry is permitted, returns the interval to sleep before the next
    /// attempt; `None` propagates the error unchanged. A server-supplied
    /// retry-after hint on the error takes precedence over computed backoff.
    fn continue_or_propagate(&mut self, error: &Error) -> Option<Duration>;

    /// A fresh clone with reset per-call state.
    fn for_call(&self) -> Box<dyn Retryer>;
}

/// Exponential backoff with a cap: the interval for attempt `n` is
/// `min(period × 1.5^(n−1), max_period)`.
///
/// Defaults to 5 attempts with a 100 ms base period capped at 1 s, which
/// yields the interval sequence 100, 150, 225, 337 ms before the error
/// propagates on the fifth attempt.
#[derive(Debug, Clone)]
pub struct DefaultRetryer {
    period: Duration,
    max_period: Duration,
    max_attempts: u32,
    attempt: u32,
    slept: Duration,
}

impl DefaultRetryer {
    pub fn new(period: Duration, max_period: Duration, max_attempts: u32) -> Self {
        Self {
            period,
            max_period,
            max_attempts,
            attempt: 1,
            slept: Duration::ZERO,
        }
    }

    /// The backoff interval for a given attempt number (1-indexed), capped
    /// at the maximum period. Fractional milliseconds are truncated.
    fn interval_for_attempt(&self, attempt: u32) -> Duration {
        let millis = self.period.as_millis() as f64 * 1.5f64.powi(attempt as i32 - 1);
        Duration::from_millis(millis as u64).min(self.max_period)
    }

    /// Attempts made so far, starting at 1.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Cumulative time this call has been told to sleep.
    pub fn slept(&self) -> Duration {
        self.slept
    }
}

impl Default for DefaultRetryer {
    fn default() -> Self {
        Self::new(Duration::from_millis(100), Duration::from_secs(1), 5)
    }
}

impl Retryer for DefaultRetryer {
    fn continue_or_propagate(&mut self, error: &Error) -> Option<Duration> {
        if self.attempt >= self.max_attempts {
            return None;
        }
        let interval = match error.retry_after() {
            Some(hint) => hint.min(self.max_period),
            None => self.interval_for_attempt(self.attempt),
        };
        self.attempt += 1;
        self.slept += interval;
        Some(interval)
    }

    fn for_call(&self) -> Box<dyn Retryer> {
        Box::new(Self::new(self.period, self.max_period, self.max_attempts))
    }
}

/// Propagates the first retryable error immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverRetry;

impl Retryer for NeverRetry {
    fn continue_or_propagate(&mut self, _error: &Error) -> Option<Duration> {
        None
    }

    fn for_call(&self) -> Box<dyn Retryer> {
        Box::new(NeverRetry)
    }
}
