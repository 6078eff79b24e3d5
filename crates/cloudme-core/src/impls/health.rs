//! HTTP health polling used by `verify`.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Polls a URL until it answers 2xx or the timeout elapses.
#[derive(Debug, Clone)]
pub struct HealthProbe {
    client: reqwest::Client,
    timeout: Duration,
    interval: Duration,
}

impl HealthProbe {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

    pub fn new(timeout: Duration, interval: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(interval.max(Duration::from_millis(500)))
            .build()?;
        Ok(Self {
            client,
            timeout,
            interval,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn wait_healthy(&self, url: &str) -> Result<(), String> {
        let deadline = Instant::now() + self.timeout;
        loop {
            let last_error = match self.client.get(url).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(url, status = %response.status(), "healthy");
                    return Ok(());
                }
                Ok(response) => format!("status {}", response.status()),
                Err(e) => e.to_string(),
            };
            debug!(url, error = %last_error, "not healthy yet");

            if Instant::now() + self.interval > deadline {
                return Err(format!(
                    "{url} not healthy after {:?}: {last_error}",
                    self.timeout
                ));
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}
