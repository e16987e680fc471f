//! Jittered exponential backoff for sink writes.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;

/// Bounded retry policy: at most `max_attempts` calls, sleeping
/// `base_delay * 2^n` (capped at `max_delay`, +/- `jitter`) between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
    /// Fraction of the delay used as a symmetric random spread.
    pub jitter: f64,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration, max_delay: Duration, jitter: f64) -> Self {
        let base_delay = base_delay.max(Duration::from_millis(1));
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: max_delay.max(base_delay),
            jitter: jitter.clamp(0.0, 1.0),
        }
    }

    /// Normalized copy; deserialized policies may carry out-of-range values.
    pub fn clamped(&self) -> Self {
        Self::new(self.max_attempts, self.base_delay, self.max_delay, self.jitter)
    }

    pub(crate) fn next_delay(&self, attempt: usize) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let max_ms = self.max_delay.as_millis() as u64;
        let exp = 2_u64.saturating_pow(attempt as u32);
        let delay = base_ms.saturating_mul(exp).min(max_ms);
        let spread = (delay as f64 * self.jitter) as i64;
        if spread == 0 {
            return Duration::from_millis(delay);
        }
        let delta = rand::thread_rng().gen_range(-spread..=spread);
        Duration::from_millis(delay.saturating_add_signed(delta))
    }

    /// Run `op` until it succeeds or `max_attempts` is reached. `op` receives
    /// the zero-based attempt index. Returns the last error and the number of
    /// attempts made.
    pub async fn retry_async<F, Fut, T, E>(&self, mut op: F) -> Result<T, (E, usize)>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let policy = self.clamped();
        let mut attempt = 0;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    attempt += 1;
                    if attempt >= policy.max_attempts {
                        return Err((err, attempt));
                    }
                    sleep(policy.next_delay(attempt - 1)).await;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_millis(250), Duration::from_secs(5), 0.2)
    }
}

#[cfg(test)]
#[path = "tests/retry_tests.rs"]
mod tests;
