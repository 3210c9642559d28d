//! Test fixtures and syncer builders

use std::path::PathBuf;
use std::sync::Arc;

use imcrate_core::{Folder, MemoryStore, Release, StaticCatalog, Syncer};

/// Get the path to a fixture file
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("test_fixtures")
        .join(name)
}

/// The two-folder catalog used across the syncer tests
#[allow(dead_code)]
pub fn testing_catalog() -> StaticCatalog {
    StaticCatalog::new()
        .with_folders(vec![Folder::new(23, "Testing"), Folder::new(25, "TestingTwo")])
        .with_releases(vec![
            Release::new(25, "Spiderland").with_master(234).in_folder(23),
            Release::new(32, "FutureWorld").with_master(234).in_folder(23),
        ])
}

/// Load a syncer over shared handles; cloning the store models a restart
#[allow(dead_code)]
pub fn open(catalog: &StaticCatalog, store: &MemoryStore) -> Syncer {
    Syncer::load(Box::new(store.clone()), Arc::new(catalog.clone()))
        .unwrap_or_else(|e| panic!("Failed to load syncer: {}", e))
}
