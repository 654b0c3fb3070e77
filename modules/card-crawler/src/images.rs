use std::time::Duration;

use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::debug;

use crate::error::{CrawlError, Result};
use crate::types::ResolvedImage;

#[async_trait]
pub trait ImageResolver: Send + Sync {
    async fn resolve(&self, url: &str) -> Result<ResolvedImage>;
}

/// Resolve every image of a post, keeping their order. The first failure
/// fails the whole set.
pub async fn resolve_all(resolver: &dyn ImageResolver, urls: &[String]) -> Result<Vec<ResolvedImage>> {
    try_join_all(urls.iter().map(|url| resolver.resolve(url))).await
}

/// Derive the on-disk extension from a response content type.
///
/// Only `image/*` is accepted; `jpeg` is shortened to `jpg`, every other
/// subtype is used as is. Parameters after `;` are ignored.
pub fn mime_kind(content_type: &str) -> Option<String> {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    let subtype = essence.strip_prefix("image/")?;
    if subtype.is_empty() {
        return None;
    }
    Some(match subtype {
        "jpeg" => "jpg".to_string(),
        other => other.to_string(),
    })
}

pub struct HttpImageResolver {
    http: reqwest::Client,
}

impl HttpImageResolver {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }
}

impl Default for HttpImageResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageResolver for HttpImageResolver {
    async fn resolve(&self, url: &str) -> Result<ResolvedImage> {
        let resp = self.http.get(url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CrawlError::Transport(format!(
                "image download from {url} returned {status}"
            )));
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let mime_kind = mime_kind(&content_type).ok_or_else(|| {
            CrawlError::Transport(format!(
                "image download from {url} has non-image content type {content_type:?}"
            ))
        })?;

        let bytes = resp.bytes().await?.to_vec();
        debug!(url, mime_kind = %mime_kind, size = bytes.len(), "Downloaded image");

        Ok(ResolvedImage { mime_kind, bytes })
    }
}
