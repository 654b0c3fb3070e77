use async_trait::async_trait;

use crate::types::Card;

/// Where freshly assembled cards are announced before they are written to disk.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, card: &Card) -> anyhow::Result<()>;
}
