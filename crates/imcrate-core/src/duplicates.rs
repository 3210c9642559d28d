//! Duplicate detection over master ids
//!
//! A full recomputation: every release in the collection, the want folder
//! included, is grouped by non-zero master id and every member of a group
//! with two or more distinct releases is flagged. Everything else, including
//! metadata for releases that have left the collection, is cleared.

use std::collections::{BTreeSet, HashMap};

use crate::folders::FolderIndex;
use crate::metadata::MetadataStore;

/// Recompute the `others` flag for every metadata record
///
/// Returns the number of releases flagged.
pub fn mark_duplicates(folders: &FolderIndex, metadata: &mut MetadataStore) -> usize {
    let mut groups: HashMap<i32, BTreeSet<i32>> = HashMap::new();
    let mut master_of: HashMap<i32, i32> = HashMap::new();

    for release in folders.releases() {
        master_of.insert(release.id, release.master_id);
        if release.master_id != 0 {
            groups.entry(release.master_id).or_default().insert(release.id);
        }
    }

    let ids: Vec<i32> = metadata.iter().map(|m| m.id).collect();
    let mut flagged = 0;
    for id in ids {
        let others = match master_of.get(&id) {
            Some(&master) if master != 0 => groups.get(&master).map_or(false, |g| g.len() >= 2),
            _ => false,
        };
        if others {
            flagged += 1;
        }
        metadata.set_others(id, others);
    }

    flagged
}
