//! Retry, backoff and throttle, kept apart so each can be tuned and tested
//! on its own.

use std::{fmt::Display, time::Duration};

use futures::future::BoxFuture;
use tokio::time::{sleep, Instant};

/// Escalating delay between attempts: `base + step * attempt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub step: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(700),
            step: Duration::from_millis(400),
        }
    }
}

impl Backoff {
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base + self.step * attempt
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff: Backoff::default(),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Attempts are numbered from 1. There is always at least one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    pub fn is_last(&self, attempt: u32) -> bool {
        attempt >= self.attempts()
    }

    /// Run `op` against `subject` until it succeeds or attempts run out,
    /// sleeping the backoff delay between attempts. The last error is
    /// returned.
    pub async fn run<S, T, E, F>(&self, subject: &mut S, label: &str, mut op: F) -> Result<T, E>
    where
        S: ?Sized,
        E: Display,
        F: for<'a> FnMut(&'a mut S) -> BoxFuture<'a, Result<T, E>>,
    {
        let mut attempt = 1;
        loop {
            match op(&mut *subject).await {
                Ok(value) => return Ok(value),
                Err(err) if self.is_last(attempt) => {
                    tracing::warn!(attempt, "{}: giving up: {}", label, err);
                    return Err(err);
                }
                Err(err) => {
                    let delay = self.backoff.delay(attempt);
                    tracing::debug!(attempt, delay = ?delay, "{}: retrying: {}", label, err);
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Lower bound on how long one iteration takes, so the origin is never hit
/// faster than that.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Throttle {
    pub min_duration: Duration,
}

impl Throttle {
    pub fn new(min_duration: Duration) -> Self {
        Self { min_duration }
    }

    pub fn remainder(&self, elapsed: Duration) -> Option<Duration> {
        self.min_duration
            .checked_sub(elapsed)
            .filter(|rest| !rest.is_zero())
    }

    /// Sleep until `min_duration` has passed since `started`. Returns how long
    /// it slept.
    pub async fn pad(&self, started: Instant) -> Duration {
        match self.remainder(started.elapsed()) {
            Some(rest) => {
                sleep(rest).await;
                rest
            }
            None => Duration::ZERO,
        }
    }
}
