use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Deserializer};

// --- Group addressing ---

/// How a community wall is addressed in `wall.get`.
///
/// Communities are owners with negative ids; `club123` is the canonical
/// short name for owner `-123`. Anything else is treated as a screen name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupRef {
    OwnerId(i64),
    Domain(String),
}

impl GroupRef {
    pub fn parse(name: &str) -> Self {
        if let Some(digits) = name.strip_prefix("club") {
            if let Ok(id) = digits.parse::<i64>() {
                return GroupRef::OwnerId(-id);
            }
        }
        GroupRef::Domain(name.to_string())
    }
}

impl fmt::Display for GroupRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupRef::OwnerId(id) => write!(f, "owner_id={id}"),
            GroupRef::Domain(domain) => write!(f, "domain={domain}"),
        }
    }
}

// --- wall.get response ---

/// Envelope every VK method answers with: either `response` or `error`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub response: Option<T>,
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error_code: i64,
    #[serde(default)]
    pub error_msg: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WallPage {
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub items: Vec<WallItem>,
}

/// A single wall post as returned by `wall.get`.
#[derive(Debug, Clone, Deserialize)]
pub struct WallItem {
    pub id: i64,
    pub owner_id: i64,
    /// Unix timestamp of publication.
    pub date: i64,
    #[serde(default)]
    pub text: String,
    #[serde(default, deserialize_with = "flag")]
    pub marked_as_ads: bool,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Attachment {
    Photo { photo: Photo },
    Video { video: Video },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Photo {
    pub id: i64,
    #[serde(default)]
    pub sizes: Vec<PhotoSize>,
}

/// One size variant of a photo. See https://vk.com/dev/photo_sizes for the
/// meaning of each `type` letter.
#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(alias = "src")]
    pub url: String,
}

impl Photo {
    /// URL of the size variant tagged `kind`, if the photo carries one.
    pub fn size(&self, kind: &str) -> Option<&str> {
        self.sizes
            .iter()
            .find(|s| s.kind == kind)
            .map(|s| s.url.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Video {
    pub id: i64,
    /// Remaining fields, including the `photo_<N>` thumbnail URLs.
    #[serde(flatten)]
    pub fields: HashMap<String, serde_json::Value>,
}

impl Video {
    /// Thumbnail URLs keyed by the numeric resolution in their `photo_<N>` field name.
    pub fn thumbnails(&self) -> impl Iterator<Item = (u32, &str)> + '_ {
        self.fields.iter().filter_map(|(key, value)| {
            let resolution = key.strip_prefix("photo_")?.parse::<u32>().ok()?;
            Some((resolution, value.as_str()?))
        })
    }

    /// Thumbnail with the highest resolution. Resolutions compare numerically,
    /// so `photo_1280` beats `photo_320`.
    pub fn largest_thumbnail(&self) -> Option<&str> {
        self.thumbnails()
            .max_by_key(|(resolution, _)| *resolution)
            .map(|(_, url)| url)
    }
}

/// VK encodes boolean flags as `0`/`1`; accept real booleans too.
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Int(i64),
        Bool(bool),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Int(n) => n != 0,
        Flag::Bool(b) => b,
    })
}
