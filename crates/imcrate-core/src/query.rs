//! Read-only queries: spend reporting and title search

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::folders::FolderIndex;
use crate::metadata::MetadataStore;
use crate::model::Release;

/// Total cost of releases added in a period
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpendReport {
    pub year: i32,
    /// 0 means the whole year
    pub month: u32,
    pub total: i64,
    /// Releases that contributed to the total
    pub release_ids: Vec<i32>,
}

/// Sum cost over metadata added in `year`, and in `month` when non-zero
pub fn spend(metadata: &MetadataStore, month: Option<u32>, year: i32) -> SpendReport {
    let month = month.unwrap_or(0);
    let mut report = SpendReport {
        year,
        month,
        ..Default::default()
    };

    for record in metadata.iter() {
        let added = record.date_added;
        if added.year() != year || (month != 0 && added.month() != month) {
            continue;
        }
        report.total = report.total.saturating_add(record.cost);
        report.release_ids.push(record.id);
    }

    report
}

/// Case-insensitive substring match against stored titles
///
/// The query is used as given, whitespace included, so an empty query
/// matches every titled release. Want-list stand-ins carry no title and
/// never match.
pub fn search(folders: &FolderIndex, query: &str) -> Vec<Release> {
    let needle = query.to_lowercase();

    folders
        .owned()
        .filter(|r| !r.title.is_empty() && r.title.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}
