//! Configuration for imcrate
//!
//! Storage location and keys, resync timing, server addresses and the
//! optional catalog export path.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default key holding the serialized collection
pub const COLLECTION_KEY: &str = "/imcrate/collection";

/// Default key holding the catalog token
pub const TOKEN_KEY: &str = "/imcrate/token";

/// System-wide configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncerConfig {
    /// Durable storage settings
    pub storage: StorageConfig,
    /// Periodic resync settings
    pub resync: ResyncConfig,
    /// RPC listener settings
    pub server: ServerConfig,
    /// Source catalog settings
    pub catalog: CatalogConfig,
}

/// Durable storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database path
    pub db_path: PathBuf,
    /// Key for the serialized collection
    pub collection_key: String,
    /// Key for the catalog token
    pub token_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            db_path: base.join("imcrate").join("collection.db"),
            collection_key: COLLECTION_KEY.to_string(),
            token_key: TOKEN_KEY.to_string(),
        }
    }
}

/// Periodic resync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResyncConfig {
    /// Seconds between resync passes
    pub interval_secs: u64,
    /// Whether the background driver runs at all
    pub enabled: bool,
}

impl Default for ResyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            enabled: true,
        }
    }
}

/// RPC listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP listen address
    pub addr: String,
    /// Optional Unix socket for line-delimited JSON-RPC
    pub socket_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8085".to_string(),
            socket_path: None,
        }
    }
}

/// Source catalog configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// JSON catalog export served by the file-backed connector
    pub snapshot_path: Option<PathBuf>,
}

impl SyncerConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Read and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_toml(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resync.interval_secs == 0 {
            return Err(ConfigError::OutOfRange(
                "resync.interval_secs must be positive".to_string(),
            ));
        }

        if self.storage.collection_key.is_empty() {
            return Err(ConfigError::MissingField("storage.collection_key".to_string()));
        }
        if self.storage.token_key.is_empty() {
            return Err(ConfigError::MissingField("storage.token_key".to_string()));
        }
        if self.storage.collection_key == self.storage.token_key {
            return Err(ConfigError::Conflict(
                "collection_key and token_key must differ".to_string(),
            ));
        }

        if self.server.addr.is_empty() {
            return Err(ConfigError::MissingField("server.addr".to_string()));
        }

        Ok(())
    }
}

/// Configuration error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Value is out of valid range
    #[error("Value out of range: {0}")]
    OutOfRange(String),
    /// Required field is missing
    #[error("Missing field: {0}")]
    MissingField(String),
    /// Two settings contradict each other
    #[error("Conflicting settings: {0}")]
    Conflict(String),
    /// Config text could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),
    /// Config file could not be read
    #[error("IO error: {0}")]
    Io(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SyncerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.resync.interval_secs, 60);
        assert_eq!(config.storage.collection_key, COLLECTION_KEY);
    }

    #[test]
    fn test_partial_toml() {
        let config = SyncerConfig::from_toml(
            r#"
[resync]
interval_secs = 5

[catalog]
snapshot_path = "/tmp/catalog.json"
"#,
        )
        .unwrap();
        assert_eq!(config.resync.interval_secs, 5);
        assert!(config.resync.enabled);
        assert_eq!(config.server.addr, "127.0.0.1:8085");
        assert!(config.catalog.snapshot_path.is_some());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = SyncerConfig::default();
        let text = config.to_toml().unwrap();
        let parsed = SyncerConfig::from_toml(&text).unwrap();
        assert_eq!(parsed.storage.db_path, config.storage.db_path);
    }

    #[test]
    fn test_invalid_values() {
        let mut config = SyncerConfig::default();
        config.resync.interval_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::OutOfRange(_))));

        let mut config = SyncerConfig::default();
        config.storage.token_key = config.storage.collection_key.clone();
        assert!(matches!(config.validate(), Err(ConfigError::Conflict(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let err = SyncerConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
