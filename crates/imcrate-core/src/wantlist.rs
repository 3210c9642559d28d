//! Want-list engine
//!
//! Entry states:
//!
//! ```text
//! wanted valued
//!  true  false   newly discovered
//!  true  true    pinned
//!  false false   collapsed
//! ```
//!
//! `wanted = false, valued = true` is never produced: pinning an entry always
//! activates it, and collapse leaves pinned entries alone.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::model::{Want, WantPatch};

/// Outcome of merging a source want-list snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WantSyncReport {
    /// Newly tracked release ids
    pub added: Vec<i32>,
    /// Tracked ids the snapshot no longer mentions; left untouched
    pub stale: Vec<i32>,
}

/// The tracked want-list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Wantlist {
    entries: Vec<Want>,
}

impl Wantlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a fresh snapshot of wanted release ids
    ///
    /// Unknown ids are added as active; existing entries keep their flags.
    pub fn sync(&mut self, release_ids: impl IntoIterator<Item = i32>) -> WantSyncReport {
        let snapshot: BTreeSet<i32> = release_ids.into_iter().filter(|id| *id != 0).collect();
        let mut report = WantSyncReport::default();

        for id in &snapshot {
            if self.add(*id) {
                report.added.push(*id);
            }
        }
        report.stale = self
            .entries
            .iter()
            .map(|w| w.release_id)
            .filter(|id| !snapshot.contains(id))
            .collect();

        report
    }

    /// Track a release; returns false if it was already tracked
    pub fn add(&mut self, release_id: i32) -> bool {
        if self.contains(release_id) {
            return false;
        }
        self.entries.push(Want::new(release_id));
        true
    }

    /// Deactivate every entry that is not pinned
    pub fn collapse(&mut self) -> &[Want] {
        for want in self.entries.iter_mut().filter(|w| !w.valued) {
            want.wanted = false;
        }
        &self.entries
    }

    /// Reactivate every entry
    pub fn rebuild(&mut self) -> &[Want] {
        for want in &mut self.entries {
            want.wanted = true;
        }
        &self.entries
    }

    /// Apply a partial update to one entry
    pub fn edit(&mut self, release_id: i32, patch: &WantPatch) -> Result<Want> {
        let want = self
            .entries
            .iter_mut()
            .find(|w| w.release_id == release_id)
            .ok_or_else(|| not_tracked(release_id))?;

        if let Some(wanted) = patch.wanted {
            want.wanted = wanted;
        }
        if let Some(valued) = patch.valued {
            want.valued = valued;
        }
        if want.valued {
            want.wanted = true;
        }
        Ok(want.clone())
    }

    /// Stop tracking a release
    pub fn delete(&mut self, release_id: i32) -> Result<Want> {
        let pos = self
            .entries
            .iter()
            .position(|w| w.release_id == release_id)
            .ok_or_else(|| not_tracked(release_id))?;
        Ok(self.entries.remove(pos))
    }

    pub fn get(&self, release_id: i32) -> Option<&Want> {
        self.entries.iter().find(|w| w.release_id == release_id)
    }

    pub fn contains(&self, release_id: i32) -> bool {
        self.get(release_id).is_some()
    }

    pub fn entries(&self) -> &[Want] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn not_tracked(release_id: i32) -> SyncError {
    SyncError::InvalidState(format!("release {} is not on the want-list", release_id))
}
