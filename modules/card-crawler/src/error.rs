use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CrawlError>;

/// Failures while turning a wall post into a card.
///
/// Everything except `DirectoryCollision` is expected in normal operation and
/// only costs the affected post its turn in the current cycle.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected {classifier} classifier label: {label:?}")]
    UnexpectedClassifierLabel {
        classifier: &'static str,
        label: String,
    },

    #[error("Post {post_id}: {media} has no usable image variant")]
    MissingImageVariant { post_id: i64, media: String },

    #[error("Post {post_id}: invalid publication timestamp {timestamp}")]
    InvalidTimestamp { post_id: i64, timestamp: i64 },

    #[error("Card directory already exists: {}", .0.display())]
    DirectoryCollision(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for CrawlError {
    fn from(err: reqwest::Error) -> Self {
        CrawlError::Transport(err.to_string())
    }
}

impl From<vk_client::VkError> for CrawlError {
    fn from(err: vk_client::VkError) -> Self {
        CrawlError::Transport(err.to_string())
    }
}
