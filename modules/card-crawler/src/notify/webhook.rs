use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::backend::Notifier;
use crate::types::Card;

/// POSTs the full card JSON to the downstream pipeline.
pub struct PipelineWebhook {
    url: String,
    http: reqwest::Client,
}

impl PipelineWebhook {
    pub fn new(url: String) -> Self {
        Self {
            url,
            http: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(url: String, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            url,
            http: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }
}

#[async_trait]
impl Notifier for PipelineWebhook {
    async fn notify(&self, card: &Card) -> anyhow::Result<()> {
        let resp = self.http.post(&self.url).json(card).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Pipeline notification returned non-success");
            anyhow::bail!("Pipeline notification returned {status}");
        }

        Ok(())
    }
}
