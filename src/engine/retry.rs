use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

/// Bounded attempts with exponential backoff between them.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled before each one after that.
    pub backoff: Duration
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(50)
        }
    }
}

impl RetryPolicy {
    pub fn delay_before(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(2).min(16);
        self.backoff.saturating_mul(1 << exponent)
    }

    /// Runs `operation` until it succeeds or the attempts are spent, returning the last error.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if attempt >= max_attempts => return Err(error),
                Err(error) => {
                    attempt += 1;
                    let delay = self.delay_before(attempt);
                    debug!("{label} failed ({error}), attempt {attempt}/{max_attempts} in {delay:?}");
                    sleep(delay).await;
                }
            }
        }
    }
}
