use chrono::Utc;
use tokio::time;

use std::future::Future;
use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 5000;

/// Retries a remote call while it reports rate limiting.
///
/// A failure carrying a reset time in the future waits until one second past the reset.
/// Otherwise it backs off exponentially, starting at `initial_delay` and doubling each time.
/// Any other error is returned right away. Holds no state between calls.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitExecutor {
    pub max_retries: u32,
    pub initial_delay: Duration,
}

impl Default for RateLimitExecutor {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
        }
    }
}

impl RateLimitExecutor {
    pub fn new(max_retries: u32, initial_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
        }
    }

    pub async fn execute<T, F, Fut>(&self, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut retries = 0;
        let mut delay = self.initial_delay;

        loop {
            let reset_at = match call().await {
                Ok(value) => return Ok(value),
                Err(Error::RateLimited { reset_at }) => reset_at,
                Err(e) => return Err(e),
            };

            if retries >= self.max_retries {
                tracing::error!("Rate limit exceeded after {} retries. Giving up", retries);
                return Err(Error::RateLimited { reset_at });
            }

            let wait = match reset_wait(reset_at, Utc::now().timestamp()) {
                Some(wait) => {
                    tracing::warn!("Rate limit hit. Waiting for reset in {} seconds", wait.as_secs());
                    wait
                }
                None => {
                    let wait = delay;
                    delay = delay.saturating_mul(2);
                    tracing::warn!("Rate limit hit. Retrying in {:.1} seconds", wait.as_secs_f64());
                    wait
                }
            };

            retries += 1;
            time::sleep(wait).await;
        }
    }
}

/// Time until one second past `reset_at`, if it lies after `now` (both epoch seconds).
fn reset_wait(reset_at: Option<i64>, now: i64) -> Option<Duration> {
    reset_at
        .filter(|reset| *reset > now)
        .map(|reset| Duration::from_secs((reset - now) as u64 + 1))
}
