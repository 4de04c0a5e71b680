use std::thread;
use std::time::Duration;

use crate::error::{CommError, Result};

/// Bounded retry with a fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero behaves like one.
    pub max_attempts: usize,
    /// Pause between a failed attempt and the next one.
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// A single attempt, no retries.
    pub const fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn attempts(&self) -> usize {
        self.max_attempts.max(1)
    }

    /// Run `f` until it succeeds or the attempts run out.
    ///
    /// `f` receives the 1-based attempt number. A connection-closed error
    /// ends the loop early, since the line will not come back by retrying.
    pub fn run<T>(&self, op: &'static str, mut f: impl FnMut(usize) -> Result<T>) -> Result<T> {
        let attempts = self.attempts();
        let mut attempt = 1;
        loop {
            let err = match f(attempt) {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            tracing::debug!(op, attempt, error = %err, "attempt failed");
            if attempt >= attempts || err.is_disconnected() {
                return Err(CommError::RetriesExhausted {
                    op,
                    attempts: attempt,
                    last: Box::new(err),
                });
            }

            attempt += 1;
            if !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
        }
    }
}
