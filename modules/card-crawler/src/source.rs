// WallSource — the feed the crawler polls.
//
// The production implementation is the VK client; tests use MockWall.

use async_trait::async_trait;
use vk_client::{GroupRef, VkClient, WallItem};

use crate::error::Result;

#[async_trait]
pub trait WallSource: Send + Sync {
    /// Fetch `count` posts starting at `offset`, newest first.
    async fn fetch(&self, group: &GroupRef, count: u32, offset: u32) -> Result<Vec<WallItem>>;
}

#[async_trait]
impl WallSource for VkClient {
    async fn fetch(&self, group: &GroupRef, count: u32, offset: u32) -> Result<Vec<WallItem>> {
        Ok(self.wall_get(group, count, offset).await?)
    }
}
