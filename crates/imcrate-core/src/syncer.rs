//! The syncer: collection, cache, storage and catalog wired together
//!
//! Every operation here corresponds to one RPC. Writes go to the catalog
//! first, then mutate the in-memory collection, then persist the whole
//! collection. A persistence failure after a successful local mutation is
//! returned as [`SyncError::Persistence`] and the mutation stays in effect.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::ReleaseCache;
use crate::collection::{CollectionView, RecordCollection};
use crate::config::{StorageConfig, COLLECTION_KEY, TOKEN_KEY};
use crate::error::{Result, SyncError};
use crate::model::{
    is_real_folder, Folder, FolderSelector, MetadataPatch, Release, ReleaseMetadata, Want,
    WantPatch,
};
use crate::persistence::KeyValueStore;
use crate::query::{self, SpendReport};
use crate::reconcile::{Reconciler, ResyncReport};
use crate::source::CatalogSource;
use crate::wantlist::WantSyncReport;

/// Highest rating the catalog accepts
pub const MAX_RATING: i32 = 5;

/// Point-in-time counters for health reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub last_resync: Option<DateTime<Utc>>,
    pub releases: usize,
    pub folders: usize,
    pub wants: usize,
    pub duplicates: usize,
    pub cached: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredToken {
    token: String,
}

/// Owns the collection for the lifetime of the process
pub struct Syncer {
    collection: RecordCollection,
    cache: ReleaseCache,
    store: Box<dyn KeyValueStore>,
    source: Arc<dyn CatalogSource>,
    collection_key: String,
    token_key: String,
    last_resync: Option<DateTime<Utc>>,
}

impl Syncer {
    /// Load the collection from storage using the default keys
    pub fn load(store: Box<dyn KeyValueStore>, source: Arc<dyn CatalogSource>) -> Result<Self> {
        Self::load_with_keys(store, source, COLLECTION_KEY, TOKEN_KEY)
    }

    /// Load using the keys from a storage config
    pub fn from_config(
        config: &StorageConfig,
        store: Box<dyn KeyValueStore>,
        source: Arc<dyn CatalogSource>,
    ) -> Result<Self> {
        Self::load_with_keys(store, source, &config.collection_key, &config.token_key)
    }

    pub fn load_with_keys(
        store: Box<dyn KeyValueStore>,
        source: Arc<dyn CatalogSource>,
        collection_key: &str,
        token_key: &str,
    ) -> Result<Self> {
        let collection = match store.read(collection_key)? {
            Some(value) => RecordCollection::from_value(value)?,
            None => {
                tracing::info!(key = collection_key, "No stored collection, starting empty");
                RecordCollection::new()
            }
        };

        tracing::debug!(
            releases = collection.folders.releases().count(),
            metadata = collection.metadata.len(),
            wants = collection.wantlist.len(),
            "Loaded collection"
        );

        Ok(Self {
            collection,
            cache: ReleaseCache::new(),
            store,
            source,
            collection_key: collection_key.to_string(),
            token_key: token_key.to_string(),
            last_resync: None,
        })
    }

    pub fn collection(&self) -> &RecordCollection {
        &self.collection
    }

    /// Write the whole collection to storage
    pub fn persist(&self) -> Result<()> {
        let value = self.collection.to_value()?;
        self.store.write(&self.collection_key, &value)?;
        Ok(())
    }

    /// Final persist before the process exits
    pub fn shutdown(&self) -> Result<()> {
        self.persist()?;
        tracing::info!("Collection persisted on shutdown");
        Ok(())
    }

    pub fn store_token(&self, token: &str) -> Result<()> {
        let value = serde_json::to_value(StoredToken {
            token: token.to_string(),
        })?;
        self.store.write(&self.token_key, &value)?;
        Ok(())
    }

    pub fn load_token(&self) -> Result<Option<String>> {
        match self.store.read(&self.token_key)? {
            Some(value) => {
                let stored: StoredToken = serde_json::from_value(value)?;
                Ok(Some(stored.token))
            }
            None => Ok(None),
        }
    }

    // ==================== Collection ====================

    /// Full reconciliation pass against the catalog, then persist
    pub fn resync(&mut self) -> Result<ResyncReport> {
        let report = Reconciler::new(self.source.as_ref()).resync(&mut self.collection)?;
        self.cache.clear();
        self.last_resync = Some(report.finished_at);
        self.persist()?;
        Ok(report)
    }

    /// Owned releases only, folders attached
    pub fn get_collection(&self) -> CollectionView {
        self.collection.view()
    }

    pub fn releases_in_folders(&self, selectors: &[FolderSelector]) -> Result<Vec<Release>> {
        self.collection.folders.releases_in(selectors)
    }

    /// Owned release, or a stand-in for a wanted one
    pub fn single_release(&mut self, release_id: i32) -> Result<Release> {
        self.collection.lookup_cached(&mut self.cache, release_id)
    }

    /// Move a release into a folder, adding it if the collection hasn't seen it
    pub fn add_to_folder(&mut self, release_id: i32, folder_id: i32) -> Result<Release> {
        let known = self.collection.folders.find(release_id).cloned();
        let release = match known {
            Some(release) if is_real_folder(release.folder_id) => {
                self.source.move_to_folder(
                    release.folder_id,
                    release.id,
                    release.instance_id,
                    folder_id,
                )?;
                release
            }
            Some(release) => {
                self.source.add_to_folder(folder_id, release.id)?;
                release
            }
            None => {
                let release = self.source.release(release_id)?;
                self.source.add_to_folder(folder_id, release.id)?;
                release
            }
        };

        self.collection.add_or_move(release, folder_id);
        self.collection.mark_duplicates();
        self.cache.invalidate(release_id);
        tracing::info!(release_id, folder_id, "Release placed in folder");

        self.persist()?;
        self.stored(release_id)
    }

    /// Set a release's rating upstream and locally
    ///
    /// Ratings run from 0 (unrated) to 5.
    pub fn update_rating(&mut self, release_id: i32, rating: i32) -> Result<Release> {
        if !(0..=MAX_RATING).contains(&rating) {
            return Err(SyncError::InvalidInput(format!(
                "rating must be between 0 and {}, got {}",
                MAX_RATING, rating
            )));
        }
        let release = self
            .collection
            .folders
            .find(release_id)
            .cloned()
            .ok_or_else(|| SyncError::release_not_found(release_id))?;

        self.source
            .set_rating(release.folder_id, release.id, release.instance_id, rating)?;

        if let Some(stored) = self.collection.folders.find_mut(release_id) {
            stored.rating = rating;
        }
        if self.collection.metadata.get(release_id).is_ok() {
            self.collection.metadata.set_rating(release_id, rating)?;
        }
        self.cache.invalidate(release_id);

        self.persist()?;
        self.stored(release_id)
    }

    fn stored(&self, release_id: i32) -> Result<Release> {
        self.collection
            .folders
            .find(release_id)
            .cloned()
            .ok_or_else(|| SyncError::release_not_found(release_id))
    }

    // ==================== Metadata ====================

    pub fn metadata(&self, release_id: i32) -> Result<ReleaseMetadata> {
        self.collection.metadata.get(release_id).cloned()
    }

    pub fn update_metadata(
        &mut self,
        release_id: i32,
        patch: &MetadataPatch,
    ) -> Result<ReleaseMetadata> {
        let updated = self.collection.metadata.update(release_id, patch)?;
        self.persist()?;
        Ok(updated)
    }

    pub fn spend(&self, month: Option<u32>, year: i32) -> SpendReport {
        query::spend(&self.collection.metadata, month, year)
    }

    pub fn search(&self, query: &str) -> Vec<Release> {
        query::search(&self.collection.folders, query)
    }

    // ==================== Want-list ====================

    pub fn wantlist(&self) -> Vec<Want> {
        self.collection.wantlist.entries().to_vec()
    }

    /// Merge the catalog's want-list into the local one
    pub fn sync_wantlist(&mut self) -> Result<WantSyncReport> {
        let wants = self.source.wantlist()?;
        let report = self
            .collection
            .wantlist
            .sync(wants.into_iter().map(|r| r.id));

        for id in &report.added {
            self.cache.invalidate(*id);
        }
        if !report.stale.is_empty() {
            tracing::debug!(stale = ?report.stale, "Want entries missing from catalog left in place");
        }

        self.persist()?;
        Ok(report)
    }

    /// Want a release upstream and start tracking it
    pub fn add_want(&mut self, release_id: i32) -> Result<Want> {
        self.source.add_to_wantlist(release_id)?;
        self.collection.wantlist.add(release_id);
        self.cache.invalidate(release_id);
        self.persist()?;
        self.collection
            .wantlist
            .get(release_id)
            .cloned()
            .ok_or_else(|| SyncError::InvalidState(format!("release {} not tracked", release_id)))
    }

    pub fn edit_want(&mut self, release_id: i32, patch: &WantPatch) -> Result<Want> {
        let want = self.collection.wantlist.edit(release_id, patch)?;
        self.persist()?;
        Ok(want)
    }

    /// Stop wanting a release, locally and upstream
    pub fn delete_want(&mut self, release_id: i32) -> Result<Want> {
        if !self.collection.wantlist.contains(release_id) {
            return Err(SyncError::InvalidState(format!(
                "release {} is not on the want-list",
                release_id
            )));
        }
        self.source.remove_from_wantlist(release_id)?;
        let removed = self.collection.wantlist.delete(release_id)?;
        self.cache.invalidate(release_id);
        self.persist()?;
        Ok(removed)
    }

    pub fn collapse_wantlist(&mut self) -> Result<Vec<Want>> {
        let wants = self.collection.wantlist.collapse().to_vec();
        self.persist()?;
        Ok(wants)
    }

    pub fn rebuild_wantlist(&mut self) -> Result<Vec<Want>> {
        let wants = self.collection.wantlist.rebuild().to_vec();
        self.persist()?;
        Ok(wants)
    }

    // ==================== Folders ====================

    pub fn save_folders(&mut self, folders: &[Folder]) -> Result<Vec<Folder>> {
        self.collection.folders.save_folders(folders);
        self.persist()?;
        Ok(self.collection.folders.folders())
    }

    pub fn folders(&self) -> Vec<Folder> {
        self.collection.folders.folders()
    }

    pub fn status(&self) -> SyncStatus {
        let (cache_hits, cache_misses) = self.cache.stats();
        SyncStatus {
            last_resync: self.last_resync,
            releases: self.collection.folders.owned_count(),
            folders: self.collection.folders.folders().len(),
            wants: self.collection.wantlist.len(),
            duplicates: self.collection.duplicate_count(),
            cached: self.cache.len(),
            cache_hits,
            cache_misses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::persistence::MemoryStore;
    use crate::source::{CatalogCall, StaticCatalog};

    fn syncer(catalog: &StaticCatalog, store: &MemoryStore) -> Syncer {
        Syncer::load(Box::new(store.clone()), Arc::new(catalog.clone())).unwrap()
    }

    #[test]
    fn test_token_round_trip() {
        let store = MemoryStore::new();
        let syncer = syncer(&StaticCatalog::new(), &store);
        assert_eq!(syncer.load_token().unwrap(), None);
        syncer.store_token("abc").unwrap();
        assert_eq!(syncer.load_token().unwrap(), Some("abc".to_string()));
        assert!(store.read(COLLECTION_KEY).unwrap().is_none());
    }

    #[test]
    fn test_add_to_folder_moves_upstream() {
        let catalog = StaticCatalog::new()
            .with_releases(vec![Release::new(25, "Spiderland").in_folder(23)]);
        let store = MemoryStore::new();
        let mut syncer = syncer(&catalog, &store);
        syncer.resync().unwrap();

        let moved = syncer.add_to_folder(25, 24).unwrap();
        assert_eq!(moved.folder_id, 24);
        assert!(catalog.calls().contains(&CatalogCall::MoveToFolder {
            folder_id: 23,
            release_id: 25,
            instance_id: 0,
            new_folder_id: 24,
        }));
    }

    #[test]
    fn test_add_unknown_release_fetches_from_catalog() {
        let catalog = StaticCatalog::new().with_wants(vec![Release::new(40, "Slint")]);
        let store = MemoryStore::new();
        let mut syncer = syncer(&catalog, &store);

        let added = syncer.add_to_folder(40, 3).unwrap();
        assert_eq!(added.title, "Slint");
        assert!(syncer.metadata(40).is_ok());
        assert_eq!(
            catalog.calls(),
            vec![CatalogCall::AddToFolder {
                folder_id: 3,
                release_id: 40
            }]
        );
    }

    #[test]
    fn test_upstream_failure_leaves_state() {
        let catalog = StaticCatalog::new()
            .with_releases(vec![Release::new(25, "Spiderland").in_folder(23)]);
        let store = MemoryStore::new();
        let mut syncer = syncer(&catalog, &store);
        syncer.resync().unwrap();

        catalog.set_offline(true);
        let err = syncer.update_rating(25, 5).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UpstreamFailure);
        assert_eq!(syncer.single_release(25).unwrap().rating, 0);
    }

    #[test]
    fn test_out_of_range_rating_rejected_before_catalog() {
        let catalog = StaticCatalog::new()
            .with_releases(vec![Release::new(25, "Spiderland").in_folder(23)]);
        let store = MemoryStore::new();
        let mut syncer = syncer(&catalog, &store);
        syncer.resync().unwrap();

        for rating in [-1, 6] {
            let err = syncer.update_rating(25, rating).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
        }
        assert!(catalog.calls().is_empty());
        assert_eq!(syncer.update_rating(25, 0).unwrap().rating, 0);
    }

    #[test]
    fn test_persistence_failure_keeps_mutation() {
        let catalog = StaticCatalog::new()
            .with_releases(vec![Release::new(25, "Spiderland").in_folder(23)]);
        let store = MemoryStore::new();
        let mut syncer = syncer(&catalog, &store);
        syncer.resync().unwrap();

        store.fail_writes(true);
        let err = syncer.update_rating(25, 4).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PersistenceFailure);
        assert_eq!(syncer.single_release(25).unwrap().rating, 4);
        assert_eq!(syncer.metadata(25).unwrap().rating, 4);
    }

    #[test]
    fn test_status_counts() {
        let catalog = StaticCatalog::new()
            .with_folders(vec![Folder::new(23, "Testing")])
            .with_releases(vec![
                Release::new(1, "A").with_master(9).in_folder(23),
                Release::new(2, "B").with_master(9).in_folder(23),
            ])
            .with_wants(vec![Release::stub(3)]);
        let store = MemoryStore::new();
        let mut syncer = syncer(&catalog, &store);
        assert!(syncer.status().last_resync.is_none());

        syncer.resync().unwrap();
        syncer.sync_wantlist().unwrap();
        let status = syncer.status();
        assert!(status.last_resync.is_some());
        assert_eq!(status.releases, 2);
        assert_eq!(status.folders, 1);
        assert_eq!(status.wants, 1);
        assert_eq!(status.duplicates, 2);
    }
}
