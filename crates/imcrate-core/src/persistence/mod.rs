//! Persistence layer for the collection
//!
//! The syncer only needs a keyed read/write of structured values. The whole
//! collection lives under one key and the catalog token under another.

#[cfg(feature = "sqlite")]
mod repository;
mod schema;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::error::PersistenceError;

#[cfg(feature = "sqlite")]
pub use repository::SqliteStore;
pub use schema::{Schema, SCHEMA_VERSION};

/// Durable key-value storage for structured values
pub trait KeyValueStore: Send {
    /// Read a value; `None` if the key has never been written
    fn read(&self, key: &str) -> Result<Option<Value>, PersistenceError>;

    /// Overwrite the value under a key
    fn write(&self, key: &str, value: &Value) -> Result<(), PersistenceError>;
}

impl<S: KeyValueStore + Sync + ?Sized> KeyValueStore for Arc<S> {
    fn read(&self, key: &str) -> Result<Option<Value>, PersistenceError> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &Value) -> Result<(), PersistenceError> {
        (**self).write(key, value)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    values: HashMap<String, Value>,
    fail_writes: bool,
}

/// In-memory store
///
/// Clones share the same map, which is how tests model a process restart
/// against the same durable store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop a key, as if removed by another writer
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.state.lock().ok()?.values.remove(key)
    }

    /// Make subsequent writes fail
    pub fn fail_writes(&self, fail: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_writes = fail;
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, PersistenceError> {
        self.state
            .lock()
            .map_err(|e| PersistenceError::Database(format!("Mutex poisoned: {}", e)))
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<Value>, PersistenceError> {
        Ok(self.lock()?.values.get(key).cloned())
    }

    fn write(&self, key: &str, value: &Value) -> Result<(), PersistenceError> {
        let mut state = self.lock()?;
        if state.fail_writes {
            return Err(PersistenceError::Io(format!("write to {} refused", key)));
        }
        state.values.insert(key.to_string(), value.clone());
        Ok(())
    }
}
