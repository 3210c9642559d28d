//! Collection data model
//!
//! Releases live inside folders. A folder with a non-positive id is the
//! pseudo "want" folder: releases placed there are desired but not owned and
//! never show up in owned-collection views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Folder id used when a release is parked as "wanted, not owned"
pub const WANT_FOLDER_ID: i32 = -5;

/// Whether a folder id names a real (owned) folder
pub fn is_real_folder(folder_id: i32) -> bool {
    folder_id > 0
}

/// A single catalog release as seen in the collection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Release {
    /// Catalog identity
    pub id: i32,
    /// Owning-instance id assigned by the catalog
    pub instance_id: i32,
    /// Grouping key shared by copies of the same record (0 = ungrouped)
    pub master_id: i32,
    pub title: String,
    pub rating: i32,
    /// Folder the release currently belongs to
    pub folder_id: i32,
}

impl Release {
    pub fn new(id: i32, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            ..Default::default()
        }
    }

    /// A stand-in carrying only the identity, for wanted-but-not-owned releases
    pub fn stub(id: i32) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn with_master(mut self, master_id: i32) -> Self {
        self.master_id = master_id;
        self
    }

    pub fn in_folder(mut self, folder_id: i32) -> Self {
        self.folder_id = folder_id;
        self
    }

    pub fn is_owned(&self) -> bool {
        is_real_folder(self.folder_id)
    }
}

/// Folder identity and display name
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Folder {
    pub id: i32,
    pub name: String,
}

impl Folder {
    pub fn new(id: i32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Selects folders by id, or by name when the id is zero
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolderSelector {
    pub id: i32,
    pub name: String,
}

impl FolderSelector {
    pub fn by_id(id: i32) -> Self {
        Self {
            id,
            name: String::new(),
        }
    }

    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
        }
    }

    pub fn matches(&self, folder: &Folder) -> bool {
        if self.id != 0 {
            folder.id == self.id
        } else {
            !self.name.is_empty() && folder.name == self.name
        }
    }

    pub fn describe(&self) -> String {
        if self.id != 0 {
            format!("folder {}", self.id)
        } else {
            format!("folder '{}'", self.name)
        }
    }
}

/// Per-release purchase metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseMetadata {
    pub id: i32,
    /// First time the release was saved into a real folder; never changes
    pub date_added: DateTime<Utc>,
    /// Last time the release was saved
    pub date_refreshed: DateTime<Utc>,
    #[serde(default)]
    pub cost: i64,
    #[serde(default)]
    pub rating: i32,
    /// Another copy with the same master id is in the collection
    #[serde(default)]
    pub others: bool,
}

impl ReleaseMetadata {
    pub fn new(id: i32, at: DateTime<Utc>) -> Self {
        Self {
            id,
            date_added: at,
            date_refreshed: at,
            cost: 0,
            rating: 0,
            others: false,
        }
    }
}

/// Partial update for release metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataPatch {
    pub cost: Option<i64>,
    pub rating: Option<i32>,
}

/// A want-list entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Want {
    pub release_id: i32,
    /// Actively tracked
    pub wanted: bool,
    /// Pinned by the user; always tracked
    #[serde(default)]
    pub valued: bool,
}

impl Want {
    pub fn new(release_id: i32) -> Self {
        Self {
            release_id,
            wanted: true,
            valued: false,
        }
    }
}

/// Partial update for a want entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WantPatch {
    pub wanted: Option<bool>,
    pub valued: Option<bool>,
}
