//! Imcrate Core - Record collection mirroring and want-list tracking
//!
//! This crate provides the core functionality for the imcrate collection syncer:
//!
//! - **Model**: Releases, folders, purchase metadata and want entries
//! - **Folders**: Folder index with placement and selector lookup
//! - **Metadata**: Per-release purchase records (date added, cost, rating, duplicate flag)
//! - **Duplicates**: Grouping of owned releases by master id
//! - **Wantlist**: Want entries with collapse / rebuild / pin semantics
//! - **Collection**: The aggregate that is persisted as one unit
//! - **Reconcile**: Folding catalog snapshots into the collection
//! - **Query**: Spend reports and title search
//! - **Source**: The catalog connector trait and its in-memory / file-backed implementations
//! - **Persistence**: Key-value storage (in-memory, SQLite behind the `sqlite` feature)
//! - **Syncer**: The orchestrator that every transport calls into
//! - **Config**: Storage, resync, server and catalog settings
//!
//! # Write path
//!
//! ```text
//! catalog call -> local mutation -> persist collection
//! ```
//!
//! A catalog failure stops before anything changes locally. A storage
//! failure after the local change is reported, and the change stays.

pub mod cache;
pub mod collection;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod folders;
pub mod metadata;
pub mod model;
pub mod persistence;
pub mod query;
pub mod reconcile;
pub mod source;
pub mod syncer;
pub mod wantlist;

pub use cache::ReleaseCache;
pub use collection::{CollectionSnapshot, CollectionView, RecordCollection, SNAPSHOT_VERSION};
pub use config::{
    CatalogConfig, ConfigError, ResyncConfig, ServerConfig, StorageConfig, SyncerConfig,
    COLLECTION_KEY, TOKEN_KEY,
};
pub use error::{ErrorKind, PersistenceError, Result, SourceError, SyncError};
pub use folders::{FolderEntry, FolderIndex};
pub use metadata::MetadataStore;
pub use model::{
    is_real_folder, Folder, FolderSelector, MetadataPatch, Release, ReleaseMetadata, Want,
    WantPatch, WANT_FOLDER_ID,
};
#[cfg(feature = "sqlite")]
pub use persistence::SqliteStore;
pub use persistence::{KeyValueStore, MemoryStore};
pub use query::SpendReport;
pub use reconcile::{Reconciler, ResyncReport};
pub use source::{CatalogCall, CatalogExport, CatalogSource, SnapshotFileCatalog, StaticCatalog};
pub use syncer::{SyncStatus, Syncer, MAX_RATING};
pub use wantlist::{WantSyncReport, Wantlist};

/// Returns the version of imcrate-core
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
