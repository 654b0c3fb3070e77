// Feed normalization: raw wall page → deduplicated posts with images.
//
// Dedup works at three levels within one page: post id, photo id, video id.
// A post that reuses a photo or video already seen earlier on the page is a
// repost and is dropped as a whole, not just the repeated attachment.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use vk_client::{Attachment, WallItem};

use crate::error::{CrawlError, Result};
use crate::types::Post;

/// Photo size variant every card image is taken from.
/// See https://vk.com/dev/photo_sizes
pub const PHOTO_SIZE: &str = "x";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum MediaKey {
    Photo(i64),
    Video(i64),
}

/// Result of normalizing one wall page.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct NormalizedPage {
    /// Candidate posts keyed (and therefore iterated) by post id.
    pub posts: BTreeMap<i64, Post>,
    /// Ids of posts marked as advertisements.
    pub ads: BTreeSet<i64>,
    /// Posts dropped as in-page repeats or reposts of seen media.
    pub duplicates: usize,
    /// Posts dropped because they could not be normalized, with the reason.
    pub rejected: Vec<(i64, String)>,
}

/// Outcome for one raw item.
enum Normalized {
    Post(Post),
    Duplicate,
    NoImages,
}

/// Normalize a raw wall page. Pure: the same page always yields the same result.
pub fn normalize(items: &[WallItem]) -> NormalizedPage {
    let mut page = NormalizedPage::default();
    let mut post_ids = HashSet::new();
    let mut media = HashSet::new();

    for item in items {
        if !post_ids.insert(item.id) {
            debug!(post_id = item.id, "Duplicate post in page");
            page.duplicates += 1;
            continue;
        }
        if item.marked_as_ads {
            debug!(post_id = item.id, "Skipping advertisement");
            page.ads.insert(item.id);
            continue;
        }

        match normalize_item(item, &mut media) {
            Ok(Normalized::Post(post)) => {
                page.posts.insert(post.id, post);
            }
            Ok(Normalized::Duplicate) => page.duplicates += 1,
            Ok(Normalized::NoImages) => {}
            Err(e) => {
                warn!(post_id = item.id, error = %e, "Dropping post that failed normalization");
                page.rejected.push((item.id, e.to_string()));
            }
        }
    }

    page
}

fn normalize_item(item: &WallItem, seen: &mut HashSet<MediaKey>) -> Result<Normalized> {
    let mut images: Vec<String> = Vec::new();
    let mut duplicate = false;

    for attachment in &item.attachments {
        let (key, url) = match attachment {
            Attachment::Photo { photo } => {
                let key = MediaKey::Photo(photo.id);
                if !seen.insert(key) {
                    debug!(post_id = item.id, photo_id = photo.id, "Duplicate photo");
                    duplicate = true;
                    continue;
                }
                let url = photo.size(PHOTO_SIZE).ok_or_else(|| CrawlError::MissingImageVariant {
                    post_id: item.id,
                    media: format!("photo {} (size '{PHOTO_SIZE}')", photo.id),
                })?;
                (key, url)
            }
            Attachment::Video { video } => {
                let key = MediaKey::Video(video.id);
                if !seen.insert(key) {
                    debug!(post_id = item.id, video_id = video.id, "Duplicate video");
                    duplicate = true;
                    continue;
                }
                let url = video
                    .largest_thumbnail()
                    .ok_or_else(|| CrawlError::MissingImageVariant {
                        post_id: item.id,
                        media: format!("video {} thumbnail", video.id),
                    })?;
                (key, url)
            }
            Attachment::Other => continue,
        };

        if !duplicate && !images.iter().any(|u| u == url) {
            images.push(url.to_string());
        } else {
            debug!(post_id = item.id, ?key, "Not collecting image");
        }
    }

    if duplicate {
        return Ok(Normalized::Duplicate);
    }
    if images.is_empty() {
        return Ok(Normalized::NoImages);
    }

    let created_at = DateTime::<Utc>::from_timestamp(item.date, 0).ok_or(
        CrawlError::InvalidTimestamp {
            post_id: item.id,
            timestamp: item.date,
        },
    )?;

    Ok(Normalized::Post(Post {
        id: item.id,
        owner_id: item.owner_id,
        created_at,
        text: item.text.clone(),
        images,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn photo(id: i64) -> Value {
        json!({"type": "photo", "photo": {"id": id, "sizes": [
            {"type": "m", "url": format!("https://img/{id}/m.jpg")},
            {"type": "x", "url": format!("https://img/{id}/x.jpg")}
        ]}})
    }

    fn item(id: i64, attachments: Vec<Value>) -> WallItem {
        serde_json::from_value(json!({
            "id": id,
            "owner_id": -10,
            "date": 1_700_000_000,
            "text": format!("post {id}"),
            "marked_as_ads": 0,
            "attachments": attachments,
        }))
        .unwrap()
    }

    #[test]
    fn photo_post_is_kept_with_x_variant() {
        let page = normalize(&[item(1, vec![photo(100)])]);
        let post = &page.posts[&1];
        assert_eq!(post.images, vec!["https://img/100/x.jpg".to_string()]);
        assert_eq!(post.owner_id, -10);
        assert_eq!(post.created_at.timestamp(), 1_700_000_000);
    }

    #[test]
    fn text_only_post_is_dropped() {
        let page = normalize(&[item(1, vec![])]);
        assert!(page.posts.is_empty());
        assert_eq!(page.duplicates, 0);
    }

    #[test]
    fn repeated_photo_inside_one_post_drops_the_post() {
        let page = normalize(&[item(1, vec![photo(100), photo(100)])]);
        assert!(page.posts.is_empty());
        assert_eq!(page.duplicates, 1);
    }

    #[test]
    fn repost_sharing_a_photo_is_dropped_and_original_kept() {
        let page = normalize(&[item(1, vec![photo(100)]), item(2, vec![photo(200), photo(100)])]);
        assert!(page.posts.contains_key(&1));
        assert!(!page.posts.contains_key(&2));
    }

    #[test]
    fn repeated_post_id_keeps_first_occurrence() {
        let mut second = item(1, vec![photo(300)]);
        second.text = "second".to_string();
        let page = normalize(&[item(1, vec![photo(100)]), second]);
        assert_eq!(page.posts[&1].text, "post 1");
        assert_eq!(page.duplicates, 1);
    }

    #[test]
    fn advertisement_is_recorded_and_excluded() {
        let mut ad = item(7, vec![photo(100)]);
        ad.marked_as_ads = true;
        let page = normalize(&[ad]);
        assert!(page.posts.is_empty());
        assert!(page.ads.contains(&7));
    }

    #[test]
    fn photo_without_x_variant_rejects_only_that_post() {
        let small_only = json!({"type": "photo", "photo": {"id": 5, "sizes": [
            {"type": "s", "url": "https://img/5/s.jpg"}
        ]}});
        let page = normalize(&[item(1, vec![small_only]), item(2, vec![photo(200)])]);
        assert_eq!(page.rejected.len(), 1);
        assert_eq!(page.rejected[0].0, 1);
        assert!(page.rejected[0].1.contains("no usable image variant"));
        assert!(page.posts.contains_key(&2));
    }

    #[test]
    fn video_uses_numerically_largest_thumbnail() {
        let video = json!({"type": "video", "video": {
            "id": 9,
            "photo_130": "https://img/v/130.jpg",
            "photo_75": "https://img/v/75.jpg",
            "photo_200": "https://img/v/200.jpg"
        }});
        let page = normalize(&[item(1, vec![video])]);
        assert_eq!(page.posts[&1].images, vec!["https://img/v/200.jpg".to_string()]);
    }

    #[test]
    fn repeated_video_drops_the_later_post() {
        let video = json!({"type": "video", "video": {"id": 9, "photo_320": "https://img/v/320.jpg"}});
        let page = normalize(&[item(1, vec![video.clone()]), item(2, vec![video])]);
        assert!(page.posts.contains_key(&1));
        assert!(!page.posts.contains_key(&2));
    }

    #[test]
    fn normalization_is_idempotent() {
        let items = vec![
            item(3, vec![photo(1), photo(2)]),
            item(1, vec![photo(2)]),
            item(2, vec![photo(4)]),
        ];
        assert_eq!(normalize(&items), normalize(&items));
    }

    #[test]
    fn no_media_is_shared_between_kept_posts() {
        let items = vec![
            item(1, vec![photo(1), photo(2)]),
            item(2, vec![photo(3)]),
            item(3, vec![photo(3), photo(4)]),
            item(4, vec![photo(2)]),
        ];
        let page = normalize(&items);
        let mut all: Vec<&String> = page.posts.values().flat_map(|p| p.images.iter()).collect();
        let total = all.len();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), total);
        assert_eq!(page.posts.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
    }
}
