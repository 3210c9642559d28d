//! Folder index
//!
//! Releases grouped by owning folder. Folders are matched by id first and by
//! name when the selector carries no id.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::model::{is_real_folder, Folder, FolderSelector, Release};

/// A folder with its releases
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FolderEntry {
    pub folder: Folder,
    #[serde(default)]
    pub releases: Vec<Release>,
}

impl FolderEntry {
    pub fn new(folder: Folder) -> Self {
        Self {
            folder,
            releases: Vec::new(),
        }
    }
}

/// Releases organised by folder
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderIndex {
    entries: Vec<FolderEntry>,
}

impl FolderIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a folder, or update its name if already known
    pub fn register(&mut self, folder: Folder) {
        match self.entries.iter_mut().find(|e| e.folder.id == folder.id) {
            Some(entry) => {
                if !folder.name.is_empty() {
                    entry.folder.name = folder.name;
                }
            }
            None => self.entries.push(FolderEntry::new(folder)),
        }
    }

    /// Register a batch of folders
    pub fn save_folders(&mut self, folders: &[Folder]) {
        for folder in folders {
            self.register(folder.clone());
        }
    }

    /// All known folders, in registration order
    pub fn folders(&self) -> Vec<Folder> {
        self.entries.iter().map(|e| e.folder.clone()).collect()
    }

    pub fn entries(&self) -> &[FolderEntry] {
        &self.entries
    }

    /// Place a release into a folder, removing it from wherever it was
    ///
    /// Returns the folder the release previously occupied, if any.
    pub fn place(&mut self, mut release: Release, folder_id: i32) -> Option<i32> {
        let previous = self.remove(release.id).map(|r| r.folder_id);

        release.folder_id = folder_id;
        let index = match self.entries.iter().position(|e| e.folder.id == folder_id) {
            Some(index) => index,
            None => {
                self.entries
                    .push(FolderEntry::new(Folder::new(folder_id, String::new())));
                self.entries.len() - 1
            }
        };
        self.entries[index].releases.push(release);
        previous
    }

    /// Remove a release from whichever folder holds it
    pub fn remove(&mut self, release_id: i32) -> Option<Release> {
        for entry in &mut self.entries {
            if let Some(pos) = entry.releases.iter().position(|r| r.id == release_id) {
                return Some(entry.releases.remove(pos));
            }
        }
        None
    }

    /// Releases in every folder matched by the selectors
    ///
    /// A selector that matches no folder is an error; a matched folder that
    /// holds nothing simply contributes nothing.
    pub fn releases_in(&self, selectors: &[FolderSelector]) -> Result<Vec<Release>> {
        let mut seen = BTreeSet::new();
        let mut releases = Vec::new();

        for selector in selectors {
            let mut matched = false;
            for entry in self.entries.iter().filter(|e| selector.matches(&e.folder)) {
                matched = true;
                for release in &entry.releases {
                    if seen.insert(release.id) {
                        releases.push(release.clone());
                    }
                }
            }
            if !matched {
                return Err(SyncError::NotFound(selector.describe()));
            }
        }

        Ok(releases)
    }

    pub fn find(&self, release_id: i32) -> Option<&Release> {
        self.releases().find(|r| r.id == release_id)
    }

    pub fn find_mut(&mut self, release_id: i32) -> Option<&mut Release> {
        self.entries
            .iter_mut()
            .flat_map(|e| e.releases.iter_mut())
            .find(|r| r.id == release_id)
    }

    /// Every stored release, including those in the pseudo want folder
    pub fn releases(&self) -> impl Iterator<Item = &Release> {
        self.entries.iter().flat_map(|e| e.releases.iter())
    }

    /// Releases in real folders only
    pub fn owned(&self) -> impl Iterator<Item = &Release> {
        self.entries
            .iter()
            .filter(|e| is_real_folder(e.folder.id))
            .flat_map(|e| e.releases.iter())
    }

    pub fn owned_count(&self) -> usize {
        self.owned().count()
    }
}
