//! Source-catalog connector
//!
//! The catalog that owns the user's collection is reached through the
//! [`CatalogSource`] capability trait. Two implementations ship here:
//! [`StaticCatalog`], an in-memory catalog that records every mutation, and
//! [`SnapshotFileCatalog`], which serves a JSON export from disk.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::error::SourceError;
use crate::model::{Folder, Release};

/// Operations the syncer needs from the source catalog
pub trait CatalogSource: Send + Sync {
    /// Every release in the user's collection, each carrying its folder id
    fn collection(&self) -> Result<Vec<Release>, SourceError>;

    /// The user's folders
    fn folders(&self) -> Result<Vec<Folder>, SourceError>;

    /// Releases on the user's want-list
    fn wantlist(&self) -> Result<Vec<Release>, SourceError>;

    /// A single release by id
    fn release(&self, release_id: i32) -> Result<Release, SourceError>;

    fn move_to_folder(
        &self,
        folder_id: i32,
        release_id: i32,
        instance_id: i32,
        new_folder_id: i32,
    ) -> Result<(), SourceError>;

    fn add_to_folder(&self, folder_id: i32, release_id: i32) -> Result<(), SourceError>;

    fn set_rating(
        &self,
        folder_id: i32,
        release_id: i32,
        instance_id: i32,
        rating: i32,
    ) -> Result<(), SourceError>;

    fn add_to_wantlist(&self, release_id: i32) -> Result<(), SourceError>;

    fn remove_from_wantlist(&self, release_id: i32) -> Result<(), SourceError>;
}

/// Exported catalog contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogExport {
    pub folders: Vec<Folder>,
    pub releases: Vec<Release>,
    pub wants: Vec<Release>,
}

/// A mutation request received by a catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogCall {
    MoveToFolder {
        folder_id: i32,
        release_id: i32,
        instance_id: i32,
        new_folder_id: i32,
    },
    AddToFolder {
        folder_id: i32,
        release_id: i32,
    },
    SetRating {
        release_id: i32,
        rating: i32,
    },
    AddToWantlist(i32),
    RemoveFromWantlist(i32),
}

#[derive(Debug, Default)]
struct CatalogState {
    export: CatalogExport,
    calls: Vec<CatalogCall>,
    offline: bool,
}

/// In-memory catalog
///
/// Clones share state, so a test can keep a handle while the syncer owns
/// another. Mutations are applied to the catalog contents and recorded.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    state: Arc<Mutex<CatalogState>>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_export(export: CatalogExport) -> Self {
        Self {
            state: Arc::new(Mutex::new(CatalogState {
                export,
                ..Default::default()
            })),
        }
    }

    pub fn with_folders(self, folders: Vec<Folder>) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.export.folders = folders;
        }
        self
    }

    pub fn with_releases(self, releases: Vec<Release>) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.export.releases = releases;
        }
        self
    }

    pub fn with_wants(self, wants: Vec<Release>) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.export.wants = wants;
        }
        self
    }

    /// Replace the collection contents
    pub fn set_releases(&self, releases: Vec<Release>) {
        if let Ok(mut state) = self.state.lock() {
            state.export.releases = releases;
        }
    }

    /// Replace the want-list contents
    pub fn set_wants(&self, wants: Vec<Release>) {
        if let Ok(mut state) = self.state.lock() {
            state.export.wants = wants;
        }
    }

    /// Make every call fail as if the catalog were unreachable
    pub fn set_offline(&self, offline: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.offline = offline;
        }
    }

    /// Mutation calls received so far
    pub fn calls(&self) -> Vec<CatalogCall> {
        self.state
            .lock()
            .map(|s| s.calls.clone())
            .unwrap_or_default()
    }

    fn online(&self) -> Result<MutexGuard<'_, CatalogState>, SourceError> {
        let state = self
            .state
            .lock()
            .map_err(|e| SourceError::Unavailable(format!("Mutex poisoned: {}", e)))?;
        if state.offline {
            return Err(SourceError::Unavailable("catalog offline".to_string()));
        }
        Ok(state)
    }
}

impl CatalogSource for StaticCatalog {
    fn collection(&self) -> Result<Vec<Release>, SourceError> {
        Ok(self.online()?.export.releases.clone())
    }

    fn folders(&self) -> Result<Vec<Folder>, SourceError> {
        Ok(self.online()?.export.folders.clone())
    }

    fn wantlist(&self) -> Result<Vec<Release>, SourceError> {
        Ok(self.online()?.export.wants.clone())
    }

    fn release(&self, release_id: i32) -> Result<Release, SourceError> {
        let state = self.online()?;
        state
            .export
            .releases
            .iter()
            .chain(state.export.wants.iter())
            .find(|r| r.id == release_id)
            .cloned()
            .ok_or_else(|| SourceError::Rejected(format!("unknown release {}", release_id)))
    }

    fn move_to_folder(
        &self,
        folder_id: i32,
        release_id: i32,
        instance_id: i32,
        new_folder_id: i32,
    ) -> Result<(), SourceError> {
        let mut state = self.online()?;
        state.calls.push(CatalogCall::MoveToFolder {
            folder_id,
            release_id,
            instance_id,
            new_folder_id,
        });
        if let Some(release) = state
            .export
            .releases
            .iter_mut()
            .find(|r| r.id == release_id)
        {
            release.folder_id = new_folder_id;
        }
        Ok(())
    }

    fn add_to_folder(&self, folder_id: i32, release_id: i32) -> Result<(), SourceError> {
        let mut state = self.online()?;
        state.calls.push(CatalogCall::AddToFolder {
            folder_id,
            release_id,
        });
        let existing = state
            .export
            .releases
            .iter_mut()
            .find(|r| r.id == release_id);
        match existing {
            Some(release) => release.folder_id = folder_id,
            None => state
                .export
                .releases
                .push(Release::stub(release_id).in_folder(folder_id)),
        }
        Ok(())
    }

    fn set_rating(
        &self,
        _folder_id: i32,
        release_id: i32,
        _instance_id: i32,
        rating: i32,
    ) -> Result<(), SourceError> {
        let mut state = self.online()?;
        state.calls.push(CatalogCall::SetRating { release_id, rating });
        if let Some(release) = state
            .export
            .releases
            .iter_mut()
            .find(|r| r.id == release_id)
        {
            release.rating = rating;
        }
        Ok(())
    }

    fn add_to_wantlist(&self, release_id: i32) -> Result<(), SourceError> {
        let mut state = self.online()?;
        state.calls.push(CatalogCall::AddToWantlist(release_id));
        if !state.export.wants.iter().any(|r| r.id == release_id) {
            state.export.wants.push(Release::stub(release_id));
        }
        Ok(())
    }

    fn remove_from_wantlist(&self, release_id: i32) -> Result<(), SourceError> {
        let mut state = self.online()?;
        state.calls.push(CatalogCall::RemoveFromWantlist(release_id));
        state.export.wants.retain(|r| r.id != release_id);
        Ok(())
    }
}

/// Catalog backed by a JSON export on disk
///
/// The file is re-read on every retrieval so edits show up on the next
/// resync. Mutations are accepted and logged but not written back.
#[derive(Debug, Clone)]
pub struct SnapshotFileCatalog {
    path: PathBuf,
}

impl SnapshotFileCatalog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn read(&self) -> Result<CatalogExport, SourceError> {
        let data = std::fs::read_to_string(&self.path).map_err(|e| {
            SourceError::Unavailable(format!("{}: {}", self.path.display(), e))
        })?;
        serde_json::from_str(&data).map_err(|e| SourceError::Parse(e.to_string()))
    }
}

impl CatalogSource for SnapshotFileCatalog {
    fn collection(&self) -> Result<Vec<Release>, SourceError> {
        Ok(self.read()?.releases)
    }

    fn folders(&self) -> Result<Vec<Folder>, SourceError> {
        Ok(self.read()?.folders)
    }

    fn wantlist(&self) -> Result<Vec<Release>, SourceError> {
        Ok(self.read()?.wants)
    }

    fn release(&self, release_id: i32) -> Result<Release, SourceError> {
        let export = self.read()?;
        export
            .releases
            .into_iter()
            .chain(export.wants)
            .find(|r| r.id == release_id)
            .ok_or_else(|| SourceError::Rejected(format!("unknown release {}", release_id)))
    }

    fn move_to_folder(
        &self,
        folder_id: i32,
        release_id: i32,
        _instance_id: i32,
        new_folder_id: i32,
    ) -> Result<(), SourceError> {
        tracing::info!(release_id, folder_id, new_folder_id, "move_to_folder (export is read-only)");
        Ok(())
    }

    fn add_to_folder(&self, folder_id: i32, release_id: i32) -> Result<(), SourceError> {
        tracing::info!(release_id, folder_id, "add_to_folder (export is read-only)");
        Ok(())
    }

    fn set_rating(
        &self,
        _folder_id: i32,
        release_id: i32,
        _instance_id: i32,
        rating: i32,
    ) -> Result<(), SourceError> {
        tracing::info!(release_id, rating, "set_rating (export is read-only)");
        Ok(())
    }

    fn add_to_wantlist(&self, release_id: i32) -> Result<(), SourceError> {
        tracing::info!(release_id, "add_to_wantlist (export is read-only)");
        Ok(())
    }

    fn remove_from_wantlist(&self, release_id: i32) -> Result<(), SourceError> {
        tracing::info!(release_id, "remove_from_wantlist (export is read-only)");
        Ok(())
    }
}
