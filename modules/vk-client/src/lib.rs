pub mod error;
pub mod types;

pub use error::{Result, VkError};
pub use types::{Attachment, GroupRef, Photo, PhotoSize, Video, WallItem, WallPage};

use std::time::Duration;

use types::ApiEnvelope;

const BASE_URL: &str = "https://api.vk.com/method";

/// API version the response types are written against.
const API_VERSION: &str = "5.131";

pub struct VkClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl VkClient {
    pub fn new(token: String) -> Self {
        Self::with_base_url(token, BASE_URL)
    }

    pub fn with_base_url(token: String, base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Use a request timeout for every call. `wall.get` normally answers in
    /// well under a second, so a stuck connection should not stall a poll cycle.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    /// Fetch one page of a community wall. `wall.get` is limited to 5000 calls
    /// per day per token; callers are expected to pace themselves.
    pub async fn wall_get(&self, group: &GroupRef, count: u32, offset: u32) -> Result<Vec<WallItem>> {
        tracing::debug!(%group, count, offset, "wall.get");

        let url = format!("{}/wall.get", self.base_url);
        let count = count.to_string();
        let offset = offset.to_string();
        let (group_key, group_value) = match group {
            GroupRef::OwnerId(id) => ("owner_id", id.to_string()),
            GroupRef::Domain(domain) => ("domain", domain.clone()),
        };
        let query: [(&str, &str); 6] = [
            (group_key, &group_value),
            ("count", &count),
            ("offset", &offset),
            ("filter", "all"),
            ("access_token", &self.token),
            ("v", API_VERSION),
        ];

        let resp = self.client.get(&url).query(&query).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(VkError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = resp.bytes().await?;
        let envelope: ApiEnvelope<WallPage> = serde_json::from_slice(&body)?;
        if let Some(err) = envelope.error {
            return Err(VkError::Vk {
                code: err.error_code,
                message: err.error_msg,
            });
        }
        let page = envelope
            .response
            .ok_or_else(|| VkError::Parse("response has neither `response` nor `error`".into()))?;

        tracing::debug!(total = page.count, returned = page.items.len(), "wall.get complete");
        Ok(page.items)
    }
}
