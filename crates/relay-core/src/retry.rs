//! Bounded, fixed-interval retry shared by the resolver and the poller.
//!
//! An attempt function is called with the 1-based attempt number and reports
//! one of four outcomes ([`Attempt`]). The combinator sleeps `interval`
//! between attempts, never after the last one, and never runs more than
//! `max_attempts` times.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::ProviderError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Retry budget shared by both phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: DEFAULT_INTERVAL,
        }
    }
}

/// Outcome of a single attempt.
#[derive(Debug)]
pub enum Attempt<T, E> {
    /// Finished; stop retrying.
    Done(T),
    /// Answered, but nothing usable yet.
    Pending,
    /// Transport-level failure; counts as a used attempt.
    Failed(ProviderError),
    /// Unrecoverable; stop immediately.
    Fatal(E),
}

/// Why [`RetryPolicy::run`] gave up.
#[derive(Debug)]
pub enum RetryError<E> {
    Exhausted {
        attempts: u32,
        last_error: Option<ProviderError>,
        /// Every attempt ended in [`Attempt::Failed`].
        all_failed: bool,
    },
    Fatal(E),
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        RetryPolicy {
            max_attempts,
            interval,
        }
    }

    /// Upper bound on time spent sleeping by one phase; `None` on overflow.
    pub fn budget(&self) -> Option<Duration> {
        self.interval.checked_mul(self.max_attempts.saturating_sub(1))
    }

    /// True once more than half of the attempts have been used.
    pub fn past_halfway(&self, attempt: u32) -> bool {
        attempt > self.max_attempts / 2
    }

    /// Drive `attempt_fn` until it finishes, fails fatally, or the budget runs out.
    pub async fn run<T, E, F, Fut>(&self, mut attempt_fn: F) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Attempt<T, E>>,
    {
        let mut last_error = None;
        let mut all_failed = self.max_attempts > 0;

        for attempt in 1..=self.max_attempts {
            match attempt_fn(attempt).await {
                Attempt::Done(value) => return Ok(value),
                Attempt::Fatal(err) => return Err(RetryError::Fatal(err)),
                Attempt::Pending => all_failed = false,
                Attempt::Failed(err) => {
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "attempt failed"
                    );
                    last_error = Some(err);
                }
            }

            if attempt < self.max_attempts && !self.interval.is_zero() {
                debug!(
                    seconds = self.interval.as_secs_f64(),
                    "waiting before retry"
                );
                tokio::time::sleep(self.interval).await;
            }
        }

        Err(RetryError::Exhausted {
            attempts: self.max_attempts,
            last_error,
            all_failed,
        })
    }
}
