use std::time::Duration;

use crate::core::errors::{AuditrailError, Result};
use crate::core::models::alert::Alert;
use crate::core::traits::channel::AlertChannel;

/// POSTs each alert as JSON to a configured endpoint.
///
/// Retries with a short linear backoff; a dead endpoint surfaces as a
/// `ChannelError` that the monitor reports without aborting capture.
#[derive(Debug)]
pub struct WebhookChannel {
    url: String,
    max_retries: u32,
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
}

impl WebhookChannel {
    pub fn new(url: impl Into<String>, max_retries: u32, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|err| AuditrailError::ChannelError {
                channel: "webhook".to_string(),
                detail: format!("failed to build HTTP client: {err}"),
            })?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(AuditrailError::Io)?;

        Ok(Self {
            url: url.into(),
            max_retries,
            client,
            runtime,
        })
    }

    async fn post_once(&self, alert: &Alert) -> std::result::Result<(), reqwest::Error> {
        self.client
            .post(&self.url)
            .json(alert)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

impl AlertChannel for WebhookChannel {
    fn name(&self) -> &str {
        "webhook"
    }

    fn send(&self, alert: &Alert) -> Result<()> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            match self.runtime.block_on(self.post_once(alert)) {
                Ok(()) => return Ok(()),
                Err(err) => {
                    last_error = Some(err);
                    if attempt < self.max_retries {
                        std::thread::sleep(Duration::from_millis(200 * (attempt as u64 + 1)));
                    }
                }
            }
        }

        Err(AuditrailError::ChannelError {
            channel: self.name().to_string(),
            detail: format!(
                "POST {} failed after {} attempts: {}",
                self.url,
                self.max_retries + 1,
                last_error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "unknown error".to_string()),
            ),
        })
    }
}
