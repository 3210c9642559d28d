//! Durable storage and file catalog integration tests

mod common;

use std::sync::Arc;

use common::fixtures::{fixture_path, open, testing_catalog};
use imcrate_core::{
    CatalogSource, ErrorKind, FolderSelector, KeyValueStore, MemoryStore, SnapshotFileCatalog,
    StaticCatalog, Syncer, COLLECTION_KEY,
};
use serde_json::json;

fn file_syncer(store: Box<dyn KeyValueStore>) -> Syncer {
    let catalog = SnapshotFileCatalog::new(fixture_path("catalog.json"));
    Syncer::load(store, Arc::new(catalog)).unwrap()
}

#[test]
fn test_file_catalog_fixture() {
    let catalog = SnapshotFileCatalog::new(fixture_path("catalog.json"));
    assert_eq!(catalog.folders().unwrap().len(), 2);
    assert_eq!(catalog.collection().unwrap().len(), 3);
    assert_eq!(catalog.release(77).unwrap().id, 77);
}

#[test]
fn test_resync_from_file_catalog() {
    let mut syncer = file_syncer(Box::new(MemoryStore::new()));
    let report = syncer.resync().unwrap();
    assert_eq!(report.releases, 3);
    assert_eq!(report.duplicates, 2);

    let testing = syncer
        .releases_in_folders(&[FolderSelector::by_name("Testing")])
        .unwrap();
    assert_eq!(testing.len(), 2);

    let wants = syncer.sync_wantlist().unwrap();
    assert_eq!(wants.added, vec![77, 78]);
}

#[test]
fn test_missing_catalog_file_is_upstream_failure() {
    let catalog = SnapshotFileCatalog::new("/definitely/not/here.json");
    let mut syncer = Syncer::load(Box::new(MemoryStore::new()), Arc::new(catalog)).unwrap();
    assert_eq!(syncer.resync().unwrap_err().kind(), ErrorKind::UpstreamFailure);
}

#[test]
fn test_corrupt_snapshot_fails_load() {
    let store = MemoryStore::new();
    store.write(COLLECTION_KEY, &json!({"folders": 3})).unwrap();
    let result = Syncer::load(Box::new(store), Arc::new(StaticCatalog::new()));
    assert_eq!(result.err().map(|e| e.kind()), Some(ErrorKind::PersistenceFailure));
}

#[test]
fn test_newer_snapshot_is_rejected() {
    let store = MemoryStore::new();
    store
        .write(COLLECTION_KEY, &json!({"schema_version": 99}))
        .unwrap();
    let result = Syncer::load(Box::new(store), Arc::new(StaticCatalog::new()));
    assert_eq!(result.err().map(|e| e.kind()), Some(ErrorKind::PersistenceFailure));
}

#[test]
fn test_snapshot_without_metadata_still_serves_release() {
    let store = MemoryStore::new();
    store
        .write(
            COLLECTION_KEY,
            &json!({
                "schema_version": 1,
                "folders": [{
                    "folder": {"id": 23, "name": "Testing"},
                    "releases": [{"id": 25, "title": "Spiderland", "folder_id": 23}]
                }],
                "metadata": [],
                "wantlist": []
            }),
        )
        .unwrap();

    let mut syncer = Syncer::load(Box::new(store), Arc::new(StaticCatalog::new())).unwrap();
    assert_eq!(syncer.single_release(25).unwrap().title, "Spiderland");
    assert_eq!(syncer.metadata(25).unwrap_err().kind(), ErrorKind::NotFound);
}

#[test]
fn test_date_refreshed_advances_across_restart() {
    let catalog = testing_catalog();
    let store = MemoryStore::new();

    let mut syncer = open(&catalog, &store);
    syncer.resync().unwrap();
    let before = syncer.metadata(25).unwrap();
    drop(syncer);

    let mut restarted = open(&catalog, &store);
    assert_eq!(restarted.metadata(25).unwrap(), before);
    restarted.resync().unwrap();
    let after = restarted.metadata(25).unwrap();
    assert!(after.date_refreshed > before.date_refreshed);
    assert_eq!(after.date_added, before.date_added);

    let reloaded = open(&catalog, &store);
    assert_eq!(reloaded.metadata(25).unwrap().date_refreshed, after.date_refreshed);
}

#[test]
fn test_token_kept_apart_from_collection() {
    let store = MemoryStore::new();
    let mut syncer = file_syncer(Box::new(store.clone()));
    syncer.store_token("secret").unwrap();
    syncer.resync().unwrap();

    let restarted = file_syncer(Box::new(store));
    assert_eq!(restarted.load_token().unwrap().as_deref(), Some("secret"));
    assert_eq!(restarted.get_collection().releases.len(), 3);
}

#[cfg(feature = "sqlite")]
mod sqlite {
    use super::*;
    use imcrate_core::{SqliteStore, WantPatch};

    #[test]
    fn test_sqlite_restart_keeps_everything() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collection.db");

        {
            let mut syncer = file_syncer(Box::new(SqliteStore::open(&path).unwrap()));
            syncer.resync().unwrap();
            syncer.sync_wantlist().unwrap();
            syncer
                .edit_want(77, &WantPatch { wanted: None, valued: Some(true) })
                .unwrap();
            syncer.delete_want(78).unwrap();
            syncer.shutdown().unwrap();
        }

        let syncer = file_syncer(Box::new(SqliteStore::open(&path).unwrap()));
        assert_eq!(syncer.get_collection().releases.len(), 3);
        let wants = syncer.wantlist();
        assert_eq!(wants.len(), 1);
        assert!(wants[0].valued);
        assert!(syncer.metadata(25).unwrap().others);
    }
}
