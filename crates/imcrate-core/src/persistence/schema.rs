//! SQLite schema for the key-value store

/// Schema version for migrations
pub const SCHEMA_VERSION: u32 = 1;

/// SQLite schema definition
pub struct Schema;

impl Schema {
    /// Get the complete schema SQL
    pub fn create_tables() -> &'static str {
        r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Serialized values keyed by path-like names
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#
    }

    /// Get migration SQL for a specific version
    pub fn migration(from_version: u32, to_version: u32) -> Option<&'static str> {
        match (from_version, to_version) {
            // (1, 2) => Some("ALTER TABLE kv_store ..."),
            _ => None,
        }
    }
}
