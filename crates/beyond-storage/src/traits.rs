//! Storage abstraction trait
//!
//! This module defines the Storage trait that all asset store backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

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

/// A persisted object: its internal key and durable reference URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
}

/// Storage abstraction trait
///
/// The upload orchestrator pre-uploads assets through this trait and only ever
/// submits the returned URL, so metadata never references an unconfirmed object.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Persist `data` under `key` and return its durable URL.
    async fn put_object(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StorageResult<StoredObject>;

    /// Delete an object by key. Deleting a missing object is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Check if an object exists
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
