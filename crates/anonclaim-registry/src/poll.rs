//! Confirmation polling against registry readers.

use anonclaim_types::ClaimResult;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Bounded retries with a fixed delay between reads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    delay: Duration,
    max_attempts: u32,
    attempt: u32,
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            delay,
            max_attempts,
            attempt: 0,
        }
    }

    /// The delay before the next read, or `None` once every attempt is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        self.attempt += 1;
        Some(self.delay)
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(10, Duration::from_millis(500))
    }
}

/// Reads until `accept` holds for the value, at most `policy.max_attempts()`
/// times. Read errors count as a failed attempt. Returns `None` when the
/// attempts run out; there is no other timeout.
pub async fn wait_for<T, F, Fut, P>(mut read: F, accept: P, mut policy: RetryPolicy) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ClaimResult<T>>,
    P: Fn(&T) -> bool,
{
    policy.reset();
    while let Some(delay) = policy.next_delay() {
        match read().await {
            Ok(value) if accept(&value) => return Some(value),
            Ok(_) => debug!("Poll attempt {} not yet satisfied", policy.attempts()),
            Err(e) => debug!("Poll attempt {} failed: {}", policy.attempts(), e),
        }
        if !policy.is_exhausted() {
            tokio::time::sleep(delay).await;
        }
    }
    None
}
