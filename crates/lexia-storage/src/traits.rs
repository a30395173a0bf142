//! Storage abstraction trait
//!
//! This module defines the Storage trait that all object-store backends
//! must implement.

use async_trait::async_trait;
use lexia_core::StorageBackend;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Artifact not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage abstraction trait
///
/// All backends (S3, local filesystem) must implement this trait so the
/// commit manager can persist artifacts without coupling to a specific
/// store.
///
/// **Key format:** see the crate root documentation. Keys are produced by
/// the `keys` module and passed in by the caller; backends never invent
/// their own layout.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write an artifact under the given key, replacing any existing
    /// object. Returns the retrievable locator (URL) for the artifact.
    async fn put(&self, key: &str, content_type: &str, data: Vec<u8>) -> StorageResult<String>;

    /// Fetch an artifact by its storage key.
    async fn get(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Check whether an artifact exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Delete an artifact by its storage key. Deleting a missing key is
    /// not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
