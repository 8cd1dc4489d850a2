use std::fmt::Display;
use std::time::Duration;

/// Exponential backoff with optional jitter for idempotent storage calls.
///
/// Never used for quiz generation: a failed generation is reported straight
/// back to the user.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub jitter_max: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(20),
            max_backoff: Duration::from_millis(250),
            jitter_max: Some(Duration::from_millis(25)),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            jitter_max: None,
        }
    }

    pub async fn run<F, Fut, T, E>(&self, operation: &str, mut f: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 1;
        let mut backoff = self.base_backoff;

        loop {
            match f().await {
                Ok(v) => return Ok(v),
                Err(e) if attempt >= self.max_attempts.max(1) => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        "{} failed (attempt {}/{}): {}",
                        operation,
                        attempt,
                        self.max_attempts,
                        e
                    );

                    let extra = match self.jitter_max {
                        Some(jitter) if !jitter.is_zero() => {
                            let jitter_ms = jitter.as_millis() as u64;
                            Duration::from_millis(rand::random::<u64>() % (jitter_ms + 1))
                        }
                        _ => Duration::ZERO,
                    };
                    tokio::time::sleep(backoff + extra).await;

                    backoff = std::cmp::min(backoff * 2, self.max_backoff);
                    attempt += 1;
                }
            }
        }
    }
}
