// Test mocks for the crawl pipeline.
//
// One mock per trait boundary:
// - MockWall (WallSource) — scripted pages, `None` entries fail the fetch
// - MockClassifier (TextClassifier) — fixed or text-keyed labels, counts calls
// - MockImages (ImageResolver) — URL→image map, unknown URLs fail
// - RecordingNotifier (Notifier) — keeps every card it was sent
//
// Plus builders for wall items, posts and classifications.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use vk_client::{GroupRef, WallItem};

use crate::classifier::TextClassifier;
use crate::error::{CrawlError, Result};
use crate::images::ImageResolver;
use crate::notify::Notifier;
use crate::source::WallSource;
use crate::types::{Card, CardType, Classification, Post, ResolvedImage, Species};

// ---------------------------------------------------------------------------
// MockWall
// ---------------------------------------------------------------------------

/// Serves scripted pages in order; the last one repeats once the script runs out.
#[derive(Clone)]
pub struct MockWall {
    pages: Arc<Mutex<VecDeque<Option<Vec<WallItem>>>>>,
    last: Arc<Mutex<Option<Vec<WallItem>>>>,
    calls: Arc<AtomicUsize>,
}

impl MockWall {
    pub fn new() -> Self {
        Self {
            pages: Arc::new(Mutex::new(VecDeque::new())),
            last: Arc::new(Mutex::new(Some(Vec::new()))),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn page(self, items: Vec<WallItem>) -> Self {
        self.pages.lock().unwrap().push_back(Some(items));
        self
    }

    pub fn failing_page(self) -> Self {
        self.pages.lock().unwrap().push_back(None);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockWall {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WallSource for MockWall {
    async fn fetch(&self, _group: &GroupRef, _count: u32, _offset: u32) -> Result<Vec<WallItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.pages.lock().unwrap().pop_front();
        let page = match next {
            Some(page) => {
                *self.last.lock().unwrap() = page.clone();
                page
            }
            None => self.last.lock().unwrap().clone(),
        };
        page.ok_or_else(|| CrawlError::Transport("MockWall: scripted fetch failure".into()))
    }
}

// ---------------------------------------------------------------------------
// MockClassifier
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct MockClassifier {
    default: Option<String>,
    by_text: HashMap<String, String>,
    calls: Arc<AtomicUsize>,
}

impl MockClassifier {
    /// Answers `label` for every text.
    pub fn fixed(label: &str) -> Self {
        Self {
            default: Some(label.to_string()),
            by_text: HashMap::new(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fails every call with a transport error unless a text is registered.
    pub fn unreachable() -> Self {
        Self {
            default: None,
            by_text: HashMap::new(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn on_text(mut self, text: &str, label: &str) -> Self {
        self.by_text.insert(text.to_string(), label.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextClassifier for MockClassifier {
    async fn label(&self, text: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.by_text
            .get(text)
            .or(self.default.as_ref())
            .cloned()
            .ok_or_else(|| CrawlError::Transport(format!("MockClassifier: no label for {text:?}")))
    }
}

// ---------------------------------------------------------------------------
// MockImages
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MockImages {
    images: HashMap<String, ResolvedImage>,
    calls: Arc<AtomicUsize>,
}

impl MockImages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_url(mut self, url: &str, mime_kind: &str, bytes: &[u8]) -> Self {
        self.images.insert(
            url.to_string(),
            ResolvedImage {
                mime_kind: mime_kind.to_string(),
                bytes: bytes.to_vec(),
            },
        );
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageResolver for MockImages {
    async fn resolve(&self, url: &str) -> Result<ResolvedImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.images
            .get(url)
            .cloned()
            .ok_or_else(|| CrawlError::Transport(format!("MockImages: no image registered for {url}")))
    }
}

// ---------------------------------------------------------------------------
// RecordingNotifier
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct RecordingNotifier {
    cards: Arc<Mutex<Vec<Card>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cards(&self) -> Vec<Card> {
        self.cards.lock().unwrap().clone()
    }

    pub fn uids(&self) -> Vec<String> {
        self.cards().into_iter().map(|c| c.uid).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, card: &Card) -> anyhow::Result<()> {
        self.cards.lock().unwrap().push(card.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub const OWNER_ID: i64 = -555;

/// URL of the `x` variant produced by `photo_attachment(photo_id)`.
pub fn photo_url(photo_id: i64) -> String {
    format!("https://img.test/{photo_id}/x.jpg")
}

pub fn photo_attachment(photo_id: i64) -> Value {
    json!({"type": "photo", "photo": {"id": photo_id, "sizes": [
        {"type": "s", "url": format!("https://img.test/{photo_id}/s.jpg")},
        {"type": "x", "url": photo_url(photo_id)}
    ]}})
}

pub fn video_attachment(video_id: i64, thumbnails: &[(u32, &str)]) -> Value {
    let mut video = serde_json::Map::new();
    video.insert("id".into(), json!(video_id));
    for (resolution, url) in thumbnails {
        video.insert(format!("photo_{resolution}"), json!(url));
    }
    json!({"type": "video", "video": video})
}

pub fn wall_item(id: i64, text: &str, attachments: Vec<Value>) -> WallItem {
    serde_json::from_value(json!({
        "id": id,
        "owner_id": OWNER_ID,
        "date": 1_700_000_000 + id,
        "text": text,
        "marked_as_ads": 0,
        "attachments": attachments,
    }))
    .expect("test wall item must deserialize")
}

pub fn post(id: i64, image_count: i64) -> Post {
    Post {
        id,
        owner_id: OWNER_ID,
        created_at: Utc.timestamp_opt(1_700_000_000 + id, 0).unwrap(),
        text: format!("post {id}"),
        images: (0..image_count).map(|i| photo_url(id * 100 + i)).collect(),
    }
}

pub fn classification() -> Classification {
    Classification {
        species: Species::Dog,
        card_type: CardType::Found,
        sex: None,
    }
}
