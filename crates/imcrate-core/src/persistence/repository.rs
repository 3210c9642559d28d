//! SQLite-backed key-value store

use std::path::Path;

use serde_json::Value;

use super::schema::{Schema, SCHEMA_VERSION};
use super::KeyValueStore;
use crate::error::PersistenceError;

/// Key-value store persisted in a SQLite database
pub struct SqliteStore {
    conn: rusqlite::Connection,
}

impl SqliteStore {
    /// Open (or create) a store at the given database path
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = rusqlite::Connection::open(path)?;
        let store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self, PersistenceError> {
        let conn = rusqlite::Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize(&self) -> Result<(), PersistenceError> {
        let current_version = self.schema_version().unwrap_or(0);

        if current_version == 0 {
            self.conn.execute_batch(Schema::create_tables())?;
            self.set_schema_version(SCHEMA_VERSION)?;
        } else if current_version < SCHEMA_VERSION {
            for version in current_version..SCHEMA_VERSION {
                if let Some(migration) = Schema::migration(version, version + 1) {
                    self.conn.execute_batch(migration)?;
                }
            }
            self.set_schema_version(SCHEMA_VERSION)?;
        } else if current_version > SCHEMA_VERSION {
            return Err(PersistenceError::SchemaVersionMismatch {
                expected: SCHEMA_VERSION,
                actual: current_version,
            });
        }

        Ok(())
    }

    /// Current schema version, if the database has been initialized
    pub fn schema_version(&self) -> Option<u32> {
        self.conn
            .query_row(
                "SELECT version FROM schema_version ORDER BY rowid DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .ok()
    }

    fn set_schema_version(&self, version: u32) -> Result<(), PersistenceError> {
        self.conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [version],
        )?;
        Ok(())
    }

    /// Keys currently stored
    pub fn keys(&self) -> Result<Vec<String>, PersistenceError> {
        let mut stmt = self.conn.prepare("SELECT key FROM kv_store ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    /// Delete a key
    pub fn remove(&self, key: &str) -> Result<bool, PersistenceError> {
        let changed = self.conn.execute("DELETE FROM kv_store WHERE key = ?1", [key])?;
        Ok(changed > 0)
    }
}

impl KeyValueStore for SqliteStore {
    fn read(&self, key: &str) -> Result<Option<Value>, PersistenceError> {
        let result = self.conn.query_row(
            "SELECT value FROM kv_store WHERE key = ?1",
            [key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &Value) -> Result<(), PersistenceError> {
        let text = serde_json::to_string(value)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO kv_store (key, value, updated_at) VALUES (?1, ?2, datetime('now'))",
            rusqlite::params![key, text],
        )?;
        Ok(())
    }
}
