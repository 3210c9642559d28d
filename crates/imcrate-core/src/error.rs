//! Error types for imcrate-core

use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias for imcrate operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Main error type for imcrate operations
#[derive(Error, Debug)]
pub enum SyncError {
    /// A release, its metadata or a folder selector is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// A request argument is outside its accepted range
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation does not apply to the current state (e.g. editing an unknown want)
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The source catalog rejected or failed a request
    #[error("Upstream error: {0}")]
    Upstream(#[from] SourceError),

    /// The durable store failed to read or write
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Configuration is invalid
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Coarse error classification used by transports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    InvalidState,
    UpstreamFailure,
    PersistenceFailure,
    Config,
}

impl ErrorKind {
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::UpstreamFailure => "upstream_failure",
            ErrorKind::PersistenceFailure => "persistence_failure",
            ErrorKind::Config => "config",
        }
    }
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::NotFound(_) => ErrorKind::NotFound,
            SyncError::InvalidInput(_) => ErrorKind::InvalidInput,
            SyncError::InvalidState(_) => ErrorKind::InvalidState,
            SyncError::Upstream(_) => ErrorKind::UpstreamFailure,
            SyncError::Persistence(_) => ErrorKind::PersistenceFailure,
            SyncError::Config(_) => ErrorKind::Config,
        }
    }

    pub(crate) fn release_not_found(id: i32) -> Self {
        SyncError::NotFound(format!("release {}", id))
    }

    pub(crate) fn metadata_not_found(id: i32) -> Self {
        SyncError::NotFound(format!("metadata for release {}", id))
    }
}

/// Source-catalog errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    /// The catalog could not be reached
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    /// The catalog refused the request
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// The catalog answered with something we could not read
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Persistence-specific errors
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// Stored snapshot was written by a newer schema
    #[error("Schema version mismatch: expected {expected}, got {actual}")]
    SchemaVersionMismatch { expected: u32, actual: u32 },
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for PersistenceError {
    fn from(err: rusqlite::Error) -> Self {
        PersistenceError::Database(err.to_string())
    }
}

impl From<std::io::Error> for PersistenceError {
    fn from(err: std::io::Error) -> Self {
        PersistenceError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        PersistenceError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Persistence(PersistenceError::Serialization(err.to_string()))
    }
}
