use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{info, warn};

use crate::error::{CrawlError, Result};
use crate::notify::Notifier;
use crate::types::{Card, CardImage, ResolvedImage};

pub const CARD_FILE: &str = "card.json";

/// Announces cards to the pipeline and persists them under `<cards_dir>/<post_id>/`.
pub struct CardEmitter {
    cards_dir: PathBuf,
    notifier: Box<dyn Notifier>,
}

impl CardEmitter {
    pub fn new(cards_dir: impl Into<PathBuf>, notifier: Box<dyn Notifier>) -> Self {
        Self {
            cards_dir: cards_dir.into(),
            notifier,
        }
    }

    pub fn card_dir(&self, post_id: i64) -> PathBuf {
        self.cards_dir.join(post_id.to_string())
    }

    /// Notify the pipeline (best effort), then write images and `card.json`.
    ///
    /// The card is written into a hidden staging directory and renamed into
    /// place, so `<post_id>/` only ever appears complete. An existing
    /// `<post_id>/` is an error: dedup should have skipped the post.
    pub async fn emit(&self, post_id: i64, mut card: Card, images: Vec<ResolvedImage>) -> Result<PathBuf> {
        let target = self.card_dir(post_id);
        if fs::try_exists(&target).await? {
            return Err(CrawlError::DirectoryCollision(target));
        }

        info!(post_id, uid = %card.uid, "Notifying pipeline");
        match self.notifier.notify(&card).await {
            Ok(()) => info!(post_id, "Pipeline notified"),
            Err(e) => warn!(post_id, error = %e, "Pipeline notification failed"),
        }

        let staging = self.cards_dir.join(format!(".{post_id}.partial"));
        if fs::try_exists(&staging).await? {
            fs::remove_dir_all(&staging).await?;
        }
        fs::create_dir(&staging).await?;

        if let Err(e) = write_card(&staging, &mut card, &images).await {
            let _ = fs::remove_dir_all(&staging).await;
            return Err(e);
        }

        // rename(2) would silently replace an empty directory created meanwhile.
        if fs::try_exists(&target).await? {
            let _ = fs::remove_dir_all(&staging).await;
            return Err(CrawlError::DirectoryCollision(target));
        }
        fs::rename(&staging, &target).await?;

        info!(post_id, dir = %target.display(), images = images.len(), "Wrote card");
        Ok(target)
    }
}

async fn write_card(dir: &Path, card: &mut Card, images: &[ResolvedImage]) -> Result<()> {
    let mut entries = Vec::with_capacity(images.len());
    for (i, image) in images.iter().enumerate() {
        let file_name = format!("{i}.{}", image.mime_kind);
        fs::write(dir.join(&file_name), &image.bytes).await?;
        entries.push(CardImage {
            kind: "file".to_string(),
            data: file_name,
        });
    }
    card.images = entries;

    fs::write(dir.join(CARD_FILE), serde_json::to_vec(&*card)?).await?;
    Ok(())
}
