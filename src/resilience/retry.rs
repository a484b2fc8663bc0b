use tokio::time::{sleep, Duration};
use anyhow::Result;
use tracing::{error, warn};

use crate::config::settings::RetryConfig;

#[derive(Debug, Clone)]
pub struct RetrySettings {
    pub attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetrySettings {
    pub fn from_config(retry: Option<&RetryConfig>) -> Self {
        Self {
            attempts: retry.and_then(|r| r.attempts).unwrap_or(3).max(1),
            base_delay_ms: retry.and_then(|r| r.base_delay_ms).unwrap_or(200),
            max_delay_ms: retry.and_then(|r| r.max_delay_ms).unwrap_or(1000),
        }
    }

    pub async fn run_with_retry<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut delay = self.base_delay_ms;
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.attempts => {
                    warn!("Attempt {attempt}/{} failed: {e}", self.attempts);
                    sleep(Duration::from_millis(delay)).await;
                    delay = (delay * 2).min(self.max_delay_ms);
                    attempt += 1;
                }
                Err(e) => {
                    error!("all {attempt} attempts failed: {e}");
                    return Err(e);
                }
            }
        }
    }
}
