//! Outbound ports (storage)
//!
//! Infrastructure implements these; the schema, validation and derived
//! evaluation code never touches a storage mechanism directly.

use async_trait::async_trait;
use thiserror::Error;

/// Whole-record key-value store, last writer wins
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value under `key`, `None` if absent
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: String) -> Result<(), StorageError>;

    /// Every key currently stored
    async fn list_keys(&self) -> Result<Vec<String>, StorageError>;

    /// Remove `key`
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Storage errors
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}
