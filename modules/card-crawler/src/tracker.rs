use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

/// Bounded set of post ids already turned into cards.
///
/// The card directories on disk are the record of what was emitted; this set
/// is only a fast path in front of them. Pruning forgets the oldest (smallest)
/// ids in memory and never touches disk.
#[derive(Debug)]
pub struct KnownIdTracker {
    cards_dir: PathBuf,
    ids: BTreeSet<i64>,
}

impl KnownIdTracker {
    /// Build the tracker from the card directories under `cards_dir`, creating
    /// the directory if it does not exist yet. Entries whose names are not
    /// integers are ignored.
    pub fn rebuild(cards_dir: impl Into<PathBuf>) -> io::Result<Self> {
        let cards_dir = cards_dir.into();
        fs::create_dir_all(&cards_dir)?;

        let mut ids = BTreeSet::new();
        for entry in fs::read_dir(&cards_dir)? {
            let entry = entry?;
            if let Some(id) = entry.file_name().to_str().and_then(|n| n.parse::<i64>().ok()) {
                ids.insert(id);
            }
        }

        info!(dir = %cards_dir.display(), known = ids.len(), "Rebuilt known card ids");
        Ok(Self { cards_dir, ids })
    }

    pub fn cards_dir(&self) -> &Path {
        &self.cards_dir
    }

    /// True if the post is tracked in memory or already has a card directory.
    pub fn is_known(&self, id: i64) -> bool {
        self.ids.contains(&id) || self.on_disk(id)
    }

    pub fn on_disk(&self, id: i64) -> bool {
        self.cards_dir.join(id.to_string()).exists()
    }

    pub fn insert(&mut self, id: i64) {
        self.ids.insert(id);
    }

    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Keep only the `capacity` largest ids. Returns how many were dropped.
    pub fn prune(&mut self, capacity: usize) -> usize {
        let len = self.ids.len();
        if len <= capacity {
            return 0;
        }

        info!(known = len, capacity, "Truncating known card ids");
        let cutoff = self.ids.iter().nth(len - capacity).copied();
        self.ids = match cutoff {
            Some(cutoff) => self.ids.split_off(&cutoff),
            None => BTreeSet::new(),
        };
        len - self.ids.len()
    }

    pub fn ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.ids.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker_with(ids: &[i64]) -> (tempfile::TempDir, KnownIdTracker) {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = KnownIdTracker::rebuild(dir.path()).unwrap();
        for id in ids {
            tracker.insert(*id);
        }
        (dir, tracker)
    }

    #[test]
    fn rebuild_reads_integer_directory_names_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("101")).unwrap();
        fs::create_dir(dir.path().join("202")).unwrap();
        fs::create_dir(dir.path().join(".303.partial")).unwrap();
        fs::create_dir(dir.path().join("notes")).unwrap();
        fs::write(dir.path().join("README"), "x").unwrap();

        let tracker = KnownIdTracker::rebuild(dir.path()).unwrap();
        assert_eq!(tracker.ids().collect::<Vec<_>>(), vec![101, 202]);
    }

    #[test]
    fn rebuild_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let cards = dir.path().join("nested").join("db");
        let tracker = KnownIdTracker::rebuild(&cards).unwrap();
        assert!(tracker.is_empty());
        assert!(cards.is_dir());
    }

    #[test]
    fn prune_keeps_largest_ids() {
        let (_dir, mut tracker) = tracker_with(&[5, 9, 12]);
        assert_eq!(tracker.prune(2), 1);
        assert_eq!(tracker.ids().collect::<Vec<_>>(), vec![9, 12]);
    }

    #[test]
    fn prune_under_capacity_is_noop() {
        let (_dir, mut tracker) = tracker_with(&[1, 2]);
        assert_eq!(tracker.prune(2), 0);
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn prune_to_zero_empties_the_set() {
        let (_dir, mut tracker) = tracker_with(&[1, 2, 3]);
        assert_eq!(tracker.prune(0), 3);
        assert!(tracker.is_empty());
    }

    #[test]
    fn prune_never_exceeds_capacity_and_keeps_top_k() {
        let ids: Vec<i64> = (0..50).map(|i| (i * 37) % 101).collect();
        let (_dir, mut tracker) = tracker_with(&ids);
        let mut expected: Vec<i64> = tracker.ids().collect();
        expected.sort_unstable();
        let expected: Vec<i64> = expected[expected.len() - 10..].to_vec();

        tracker.prune(10);
        assert_eq!(tracker.len(), 10);
        assert_eq!(tracker.ids().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn pruned_id_is_still_known_through_disk() {
        let (dir, mut tracker) = tracker_with(&[1, 2, 3]);
        fs::create_dir(dir.path().join("1")).unwrap();

        tracker.prune(2);
        assert!(!tracker.contains(1));
        assert!(tracker.is_known(1));
        assert!(dir.path().join("1").exists());
    }

    #[test]
    fn insert_is_idempotent() {
        let (_dir, mut tracker) = tracker_with(&[]);
        tracker.insert(4);
        tracker.insert(4);
        assert_eq!(tracker.len(), 1);
        assert!(tracker.is_known(4));
    }
}
