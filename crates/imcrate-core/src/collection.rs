//! Collection aggregate root
//!
//! Owns the folder index, metadata store and want-list, and is the single
//! unit of durable persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::ReleaseCache;
use crate::duplicates;
use crate::error::{PersistenceError, Result, SyncError};
use crate::folders::FolderIndex;
use crate::metadata::MetadataStore;
use crate::model::{is_real_folder, Folder, Release};
use crate::wantlist::Wantlist;

/// Version of the durable snapshot layout
pub const SNAPSHOT_VERSION: u32 = 1;

/// Durable layout: folders -> releases, metadata, want entries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionSnapshot {
    pub schema_version: u32,
    #[serde(default)]
    pub folders: FolderIndex,
    #[serde(default)]
    pub metadata: MetadataStore,
    #[serde(default)]
    pub wantlist: Wantlist,
}

/// Owned releases with their folders attached
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionView {
    pub folders: Vec<Folder>,
    pub releases: Vec<Release>,
}

/// The in-memory authoritative collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordCollection {
    pub folders: FolderIndex,
    pub metadata: MetadataStore,
    pub wantlist: Wantlist,
}

impl RecordCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or move a release into a folder and record the save in metadata
    pub fn add_or_move(&mut self, release: Release, folder_id: i32) -> Option<i32> {
        self.add_or_move_at(release, folder_id, Utc::now())
    }

    pub fn add_or_move_at(
        &mut self,
        release: Release,
        folder_id: i32,
        at: DateTime<Utc>,
    ) -> Option<i32> {
        let release_id = release.id;
        let previous = self.folders.place(release, folder_id);
        self.metadata.upsert_at(release_id, folder_id, at);
        previous
    }

    /// Recompute duplicate flags; returns the number flagged
    pub fn mark_duplicates(&mut self) -> usize {
        duplicates::mark_duplicates(&self.folders, &mut self.metadata)
    }

    /// Look a release up, falling back to a stand-in for wanted releases
    ///
    /// Only releases in real folders come back as stored. One parked in the
    /// want folder, or tracked on the want-list, resolves to a stand-in
    /// carrying just the id.
    pub fn lookup(&self, release_id: i32) -> Result<Release> {
        match self.folders.find(release_id) {
            Some(release) if release.is_owned() => Ok(release.clone()),
            Some(_) => Ok(Release::stub(release_id)),
            None if self.wantlist.contains(release_id) => Ok(Release::stub(release_id)),
            None => Err(SyncError::release_not_found(release_id)),
        }
    }

    /// Cached variant of [`lookup`](Self::lookup)
    pub fn lookup_cached(&self, cache: &mut ReleaseCache, release_id: i32) -> Result<Release> {
        if let Some(release) = cache.get(release_id) {
            return Ok(release);
        }
        let release = self.lookup(release_id)?;
        cache.insert(release.clone());
        Ok(release)
    }

    /// Owned releases only, with folders attached
    pub fn view(&self) -> CollectionView {
        CollectionView {
            folders: self
                .folders
                .folders()
                .into_iter()
                .filter(|f| is_real_folder(f.id))
                .collect(),
            releases: self.folders.owned().cloned().collect(),
        }
    }

    pub fn duplicate_count(&self) -> usize {
        self.metadata.iter().filter(|m| m.others).count()
    }

    pub fn to_snapshot(&self) -> CollectionSnapshot {
        CollectionSnapshot {
            schema_version: SNAPSHOT_VERSION,
            folders: self.folders.clone(),
            metadata: self.metadata.clone(),
            wantlist: self.wantlist.clone(),
        }
    }

    /// Restore from a snapshot, dropping metadata that can't belong to a release
    pub fn from_snapshot(snapshot: CollectionSnapshot) -> std::result::Result<Self, PersistenceError> {
        if snapshot.schema_version > SNAPSHOT_VERSION {
            return Err(PersistenceError::SchemaVersionMismatch {
                expected: SNAPSHOT_VERSION,
                actual: snapshot.schema_version,
            });
        }

        let mut collection = Self {
            folders: snapshot.folders,
            metadata: snapshot.metadata,
            wantlist: snapshot.wantlist,
        };
        let dropped = collection.metadata.discard_invalid();
        if dropped > 0 {
            tracing::warn!(count = dropped, "Discarded metadata records without a release id");
        }
        Ok(collection)
    }

    pub fn to_value(&self) -> std::result::Result<serde_json::Value, PersistenceError> {
        Ok(serde_json::to_value(self.to_snapshot())?)
    }

    pub fn from_value(value: serde_json::Value) -> std::result::Result<Self, PersistenceError> {
        let snapshot: CollectionSnapshot = serde_json::from_value(value)?;
        Self::from_snapshot(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::{ReleaseMetadata, WANT_FOLDER_ID};

    #[test]
    fn test_add_or_move_cascades_metadata() {
        let mut collection = RecordCollection::new();
        collection.add_or_move(Release::new(25, "Spiderland"), 23);
        assert!(collection.metadata.get(25).is_ok());

        collection.add_or_move(Release::stub(26), WANT_FOLDER_ID);
        assert!(collection.metadata.get(26).is_err());
        let view = collection.view();
        assert_eq!(view.releases.len(), 1);
        assert_eq!(view.folders.len(), 1);
        assert_eq!(view.folders[0].id, 23);
    }

    #[test]
    fn test_lookup_of_parked_release_is_stand_in() {
        let mut collection = RecordCollection::new();
        let mut release = Release::new(25, "Spiderland");
        release.rating = 4;
        collection.add_or_move(release, WANT_FOLDER_ID);

        let found = collection.lookup(25).unwrap();
        assert_eq!(found, Release::stub(25));
        assert_eq!(found.folder_id, 0);
        assert_eq!(found.rating, 0);
    }

    #[test]
    fn test_lookup_prefers_owned_over_want() {
        let mut collection = RecordCollection::new();
        collection.wantlist.add(25);
        assert_eq!(collection.lookup(25).unwrap(), Release::stub(25));

        collection.add_or_move(Release::new(25, "Spiderland"), 23);
        assert_eq!(collection.lookup(25).unwrap().title, "Spiderland");
        assert_eq!(
            collection.lookup(26).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_snapshot_round_trip_and_cleanup() {
        let mut collection = RecordCollection::new();
        collection.folders.register(Folder::new(23, "Testing"));
        collection.add_or_move(Release::new(25, "Spiderland").with_master(9), 23);
        collection.wantlist.add(40);
        collection.metadata.restore(ReleaseMetadata::new(0, Utc::now()));

        let value = collection.to_value().unwrap();
        assert_eq!(value["schema_version"], SNAPSHOT_VERSION);

        let restored = RecordCollection::from_value(value).unwrap();
        assert_eq!(restored.folders, collection.folders);
        assert_eq!(restored.wantlist, collection.wantlist);
        assert_eq!(restored.metadata.len(), 1);
    }

    #[test]
    fn test_newer_snapshot_rejected() {
        let value = serde_json::json!({ "schema_version": SNAPSHOT_VERSION + 1 });
        let err = RecordCollection::from_value(value).unwrap_err();
        assert!(matches!(err, PersistenceError::SchemaVersionMismatch { .. }));
    }
}
