#[cfg(feature = "storage-http")]
use crate::HttpStorage;
#[cfg(feature = "storage-local")]
use crate::LocalStorage;
use crate::{Storage, StorageBackend, StorageError, StorageResult};
use beyond_core::ClientConfig;
use std::sync::Arc;

/// Create a storage backend based on configuration
pub async fn create_storage(config: &ClientConfig) -> StorageResult<Arc<dyn Storage>> {
    match config.storage_backend {
        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let base_path = config.local_storage_path.clone().ok_or_else(|| {
                StorageError::ConfigError("LOCAL_STORAGE_PATH not configured".to_string())
            })?;
            let base_url = config.local_storage_base_url.clone().ok_or_else(|| {
                StorageError::ConfigError("LOCAL_STORAGE_BASE_URL not configured".to_string())
            })?;

            let storage = LocalStorage::new(base_path, base_url).await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-http")]
        StorageBackend::Http => {
            let endpoint = config.storage_http_endpoint.clone().ok_or_else(|| {
                StorageError::ConfigError("STORAGE_HTTP_ENDPOINT not configured".to_string())
            })?;
            let storage = HttpStorage::new(
                endpoint,
                config.storage_http_token.clone(),
                std::time::Duration::from_secs(config.http_timeout_secs),
            )?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-http"))]
        StorageBackend::Http => Err(StorageError::ConfigError(
            "HTTP storage backend not available (storage-http feature not enabled)".to_string(),
        )),
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_local_storage() {
        let temp = tempfile::tempdir().unwrap();
        let config = ClientConfig {
            storage_backend: StorageBackend::Local,
            local_storage_path: Some(temp.path().display().to_string()),
            local_storage_base_url: Some("http://localhost:8080/assets".to_string()),
            ..ClientConfig::default()
        };
        let storage = create_storage(&config).await.unwrap();
        assert_eq!(storage.backend_type(), StorageBackend::Local);
    }

    #[tokio::test]
    async fn test_missing_settings() {
        let config = ClientConfig {
            storage_backend: StorageBackend::Http,
            storage_http_endpoint: None,
            ..ClientConfig::default()
        };
        let err = create_storage(&config).await.err().unwrap();
        assert!(matches!(err, StorageError::ConfigError(_)));

        let config = ClientConfig {
            storage_backend: StorageBackend::Local,
            local_storage_path: None,
            ..ClientConfig::default()
        };
        assert!(create_storage(&config).await.is_err());
    }
}
