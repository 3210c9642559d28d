//! Id-indexed release cache

use std::collections::HashMap;

use crate::model::Release;

/// Memoised single-release lookups
///
/// Filled on first successful lookup. Cleared wholesale on resync and per id
/// on any write touching that release.
#[derive(Debug, Default)]
pub struct ReleaseCache {
    entries: HashMap<i32, Release>,
    hits: u64,
    misses: u64,
}

impl ReleaseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, release_id: i32) -> Option<Release> {
        match self.entries.get(&release_id) {
            Some(release) => {
                self.hits += 1;
                Some(release.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, release: Release) {
        self.entries.insert(release.id, release);
    }

    pub fn invalidate(&mut self, release_id: i32) {
        self.entries.remove(&release_id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (hits, misses) since creation
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}
