//! Collection reconciliation
//!
//! Folds a fresh source snapshot into the local collection. Releases the
//! snapshot no longer mentions are kept; removal only happens through an
//! explicit move. Both catalog reads happen before anything is mutated, so a
//! failed retrieval leaves the collection untouched.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::collection::RecordCollection;
use crate::error::Result;
use crate::source::CatalogSource;

/// Summary of one resync pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResyncReport {
    /// Releases applied from the snapshot
    pub releases: usize,
    /// Folders reported by the catalog
    pub folders: usize,
    /// Releases flagged as having another copy
    pub duplicates: usize,
    /// Snapshot entries skipped for lack of an id
    pub skipped: usize,
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

/// Applies catalog snapshots to a collection
pub struct Reconciler<'a> {
    source: &'a dyn CatalogSource,
}

impl<'a> Reconciler<'a> {
    pub fn new(source: &'a dyn CatalogSource) -> Self {
        Self { source }
    }

    /// Pull folders and releases and fold them into the collection
    pub fn resync(&self, collection: &mut RecordCollection) -> Result<ResyncReport> {
        let started = Instant::now();
        let folders = self.source.folders()?;
        let releases = self.source.collection()?;

        collection.folders.save_folders(&folders);

        let now = Utc::now();
        let mut applied = 0;
        let mut skipped = 0;
        for release in releases {
            if release.id == 0 {
                skipped += 1;
                continue;
            }
            let folder_id = release.folder_id;
            collection.add_or_move_at(release, folder_id, now);
            applied += 1;
        }
        if skipped > 0 {
            tracing::warn!(count = skipped, "Skipped snapshot releases without an id");
        }

        let duplicates = collection.mark_duplicates();

        Ok(ResyncReport {
            releases: applied,
            folders: folders.len(),
            duplicates,
            skipped,
            finished_at: Utc::now(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }
}
