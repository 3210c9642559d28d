//! Per-release metadata store
//!
//! Metadata is created the first time a release is saved into a real folder
//! and refreshed on every save after that. `date_added` is written once;
//! `date_refreshed` strictly advances, even when two saves land on the same
//! clock reading.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::model::{is_real_folder, MetadataPatch, ReleaseMetadata};

/// Metadata records keyed by release id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<ReleaseMetadata>", into = "Vec<ReleaseMetadata>")]
pub struct MetadataStore {
    records: BTreeMap<i32, ReleaseMetadata>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a save of `release_id` into `folder_id` at the current time
    pub fn upsert(&mut self, release_id: i32, folder_id: i32) -> Option<&ReleaseMetadata> {
        self.upsert_at(release_id, folder_id, Utc::now())
    }

    /// Record a save at an explicit time
    ///
    /// Saves into the pseudo want folder never create or touch metadata.
    pub fn upsert_at(
        &mut self,
        release_id: i32,
        folder_id: i32,
        at: DateTime<Utc>,
    ) -> Option<&ReleaseMetadata> {
        if !is_real_folder(folder_id) {
            return self.records.get(&release_id);
        }

        let record = self
            .records
            .entry(release_id)
            .and_modify(|m| {
                m.date_refreshed = if at > m.date_refreshed {
                    at
                } else {
                    m.date_refreshed + Duration::nanoseconds(1)
                };
            })
            .or_insert_with(|| ReleaseMetadata::new(release_id, at));
        Some(&*record)
    }

    /// Get metadata for a release
    pub fn get(&self, release_id: i32) -> Result<&ReleaseMetadata> {
        self.records
            .get(&release_id)
            .ok_or_else(|| SyncError::metadata_not_found(release_id))
    }

    /// Apply a patch to existing metadata; never creates a record
    pub fn update(&mut self, release_id: i32, patch: &MetadataPatch) -> Result<ReleaseMetadata> {
        let record = self
            .records
            .get_mut(&release_id)
            .ok_or_else(|| SyncError::metadata_not_found(release_id))?;
        if let Some(cost) = patch.cost {
            record.cost = cost;
        }
        if let Some(rating) = patch.rating {
            record.rating = rating;
        }
        Ok(record.clone())
    }

    pub fn set_rating(&mut self, release_id: i32, rating: i32) -> Result<()> {
        let record = self
            .records
            .get_mut(&release_id)
            .ok_or_else(|| SyncError::metadata_not_found(release_id))?;
        record.rating = rating;
        Ok(())
    }

    pub(crate) fn set_others(&mut self, release_id: i32, others: bool) {
        if let Some(record) = self.records.get_mut(&release_id) {
            record.others = others;
        }
    }

    /// Put a record back as-is (used when restoring from storage)
    pub fn restore(&mut self, record: ReleaseMetadata) {
        self.records.insert(record.id, record);
    }

    pub fn remove(&mut self, release_id: i32) -> Option<ReleaseMetadata> {
        self.records.remove(&release_id)
    }

    /// Drop records that cannot belong to any release
    pub(crate) fn discard_invalid(&mut self) -> usize {
        let before = self.records.len();
        self.records.retain(|id, _| *id != 0);
        before - self.records.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReleaseMetadata> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl From<Vec<ReleaseMetadata>> for MetadataStore {
    fn from(records: Vec<ReleaseMetadata>) -> Self {
        Self {
            records: records.into_iter().map(|m| (m.id, m)).collect(),
        }
    }
}

impl From<MetadataStore> for Vec<ReleaseMetadata> {
    fn from(store: MetadataStore) -> Self {
        store.records.into_values().collect()
    }
}
