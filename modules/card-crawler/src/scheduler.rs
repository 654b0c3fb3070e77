use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};
use vk_client::GroupRef;

use crate::card::{assemble, escape_group_name};
use crate::classifier::ClassificationPipeline;
use crate::emitter::CardEmitter;
use crate::error::{CrawlError, Result};
use crate::feed::normalize;
use crate::images::{resolve_all, ImageResolver};
use crate::source::WallSource;
use crate::tracker::KnownIdTracker;
use crate::types::{Location, Post, Verdict};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Interval between wall fetches so that all crawlers sharing one token stay
/// within `requests_per_day`, but never shorter than `min_secs`.
pub fn poll_interval(min_secs: u64, requests_per_day: u32, crawlers: u32) -> Duration {
    let budget_secs = SECONDS_PER_DAY * f64::from(crawlers) / f64::from(requests_per_day.max(1));
    Duration::from_secs_f64(budget_secs.max(min_secs as f64))
}

/// Time left to sleep after a cycle that took `elapsed`. Overruns are not
/// caught up: the next cycle simply starts immediately.
pub fn sleep_duration(interval: Duration, elapsed: Duration) -> Duration {
    interval.saturating_sub(elapsed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Fetching,
    Sleeping(Duration),
}

/// What happened to a single new post.
#[derive(Debug)]
pub enum PostOutcome {
    Emitted(PathBuf),
    Gated(Verdict),
}

/// Stats from one poll cycle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleStats {
    pub fetch_failed: bool,
    pub pruned: usize,
    pub fetched: usize,
    pub ads: usize,
    pub duplicates: usize,
    pub rejected: usize,
    pub candidates: usize,
    pub new_posts: usize,
    pub emitted: usize,
    pub gated: usize,
    pub failed: usize,
}

impl std::fmt::Display for CycleStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.fetch_failed {
            return write!(f, "Poll cycle: wall fetch failed");
        }
        write!(
            f,
            "Poll cycle: fetched={} ads={} duplicates={} rejected={} candidates={} new={} emitted={} gated={} failed={} pruned={}",
            self.fetched,
            self.ads,
            self.duplicates,
            self.rejected,
            self.candidates,
            self.new_posts,
            self.emitted,
            self.gated,
            self.failed,
            self.pruned,
        )
    }
}

/// Static knobs of the poll loop.
#[derive(Debug, Clone)]
pub struct PollSettings {
    pub group_name: String,
    pub fetch_count: u32,
    pub tracking_capacity: usize,
    pub interval: Duration,
    pub location: Location,
}

/// Drives the crawl: fetch, diff against known ids, process new posts, sleep.
pub struct PollScheduler {
    wall: Box<dyn WallSource>,
    group: GroupRef,
    escaped_group: String,
    fetch_count: u32,
    tracking_capacity: usize,
    interval: Duration,
    location: Location,
    tracker: KnownIdTracker,
    classifier: ClassificationPipeline,
    images: Box<dyn ImageResolver>,
    emitter: CardEmitter,
}

impl PollScheduler {
    pub fn new(
        settings: PollSettings,
        wall: Box<dyn WallSource>,
        tracker: KnownIdTracker,
        classifier: ClassificationPipeline,
        images: Box<dyn ImageResolver>,
        emitter: CardEmitter,
    ) -> Self {
        Self {
            wall,
            group: GroupRef::parse(&settings.group_name),
            escaped_group: escape_group_name(&settings.group_name),
            fetch_count: settings.fetch_count,
            tracking_capacity: settings.tracking_capacity,
            interval: settings.interval,
            location: settings.location,
            tracker,
            classifier,
            images,
            emitter,
        }
    }

    pub fn tracker(&self) -> &KnownIdTracker {
        &self.tracker
    }

    /// Alternate between fetching and sleeping until the process is killed.
    pub async fn run(&mut self) {
        let mut state = PollState::Fetching;
        loop {
            state = self.step(state).await;
        }
    }

    /// Advance the state machine by one state.
    pub async fn step(&mut self, state: PollState) -> PollState {
        match state {
            PollState::Fetching => {
                let started = Instant::now();
                let stats = self.run_cycle().await;
                info!("{stats}");
                PollState::Sleeping(sleep_duration(self.interval, started.elapsed()))
            }
            PollState::Sleeping(remaining) => {
                if !remaining.is_zero() {
                    info!(seconds = remaining.as_secs_f64(), "Sleeping until next poll");
                    tokio::time::sleep(remaining).await;
                }
                PollState::Fetching
            }
        }
    }

    /// One fetch cycle: prune, fetch, normalize, process every new post.
    pub async fn run_cycle(&mut self) -> CycleStats {
        let mut stats = CycleStats {
            pruned: self.tracker.prune(self.tracking_capacity),
            ..CycleStats::default()
        };

        info!(group = %self.group, count = self.fetch_count, "Fetching wall");
        let items = match self.wall.fetch(&self.group, self.fetch_count, 0).await {
            Ok(items) => items,
            Err(e) => {
                error!(error = %e, "Wall fetch failed, retrying next cycle");
                stats.fetch_failed = true;
                return stats;
            }
        };

        let page = normalize(&items);
        stats.fetched = items.len();
        stats.ads = page.ads.len();
        stats.duplicates = page.duplicates;
        stats.rejected = page.rejected.len();
        stats.candidates = page.posts.len();

        for ad in &page.ads {
            self.tracker.insert(*ad);
        }

        let new_posts: Vec<Post> = page
            .posts
            .into_values()
            .filter(|post| !self.tracker.is_known(post.id))
            .collect();
        stats.new_posts = new_posts.len();
        info!(count = new_posts.len(), "Detected new posts");

        for post in &new_posts {
            match self.process_post(post).await {
                Ok(PostOutcome::Emitted(dir)) => {
                    debug!(post_id = post.id, dir = %dir.display(), "Tracking emitted card");
                    self.tracker.insert(post.id);
                    stats.emitted += 1;
                }
                Ok(PostOutcome::Gated(verdict)) => {
                    info!(post_id = post.id, ?verdict, "Skipping post");
                    stats.gated += 1;
                }
                Err(e @ CrawlError::DirectoryCollision(_)) => {
                    error!(post_id = post.id, error = %e, "Card directory collision");
                    stats.failed += 1;
                }
                Err(e) => {
                    warn!(post_id = post.id, error = %e, "Failed to process post");
                    stats.failed += 1;
                }
            }
        }

        stats
    }

    /// Classify, download, assemble and emit one post.
    pub async fn process_post(&self, post: &Post) -> Result<PostOutcome> {
        let verdict = self.classifier.classify(post.id, &post.text).await?;
        let Verdict::Accepted(classification) = verdict else {
            return Ok(PostOutcome::Gated(verdict));
        };

        let images = resolve_all(self.images.as_ref(), &post.images).await?;
        let card = assemble(&self.escaped_group, &self.location, post, &classification, &images);
        let dir = self.emitter.emit(post.id, card, images).await?;

        Ok(PostOutcome::Emitted(dir))
    }
}
