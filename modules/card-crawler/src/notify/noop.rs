use async_trait::async_trait;

use super::backend::Notifier;
use crate::types::Card;

/// Used when no pipeline notification URL is configured.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, card: &Card) -> anyhow::Result<()> {
        tracing::debug!(uid = %card.uid, "Pipeline notification URL not set, skipping");
        Ok(())
    }
}
