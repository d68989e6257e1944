use crate::keys::validate_key;
use crate::traits::{Storage, StorageError, StorageResult, StoredObject};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage implementation
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for stored assets (e.g., "./beyond-assets")
    /// * `base_url` - Base URL the assets are served from (e.g., "http://localhost:8080/assets")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url,
        })
    }

    /// Convert storage key to filesystem path, refusing anything that would
    /// resolve outside the base directory.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        validate_key(storage_key)?;

        let path = self.base_path.join(storage_key);

        let base_canonical = self.base_path.canonicalize().map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
        })?;

        if let Ok(canonical) = path.canonicalize() {
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        } else if path.strip_prefix(&self.base_path).is_err() {
            return Err(StorageError::InvalidKey(
                "Storage key resolves outside storage directory".to_string(),
            ));
        }

        Ok(path)
    }

    fn generate_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn put_object(
        &self,
        key: &str,
        data: Bytes,
        _content_type: &str,
    ) -> StorageResult<StoredObject> {
        let path = self.key_to_path(key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        let url = self.generate_url(key);

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(StoredObject {
            key: key.to_string(),
            url,
        })
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), key = %key, "Local storage delete successful");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(key = %key, "Delete of missing object ignored");
                Ok(())
            }
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to delete file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
