//! HTTP object store backend.
//!
//! Objects are written with `PUT {endpoint}/{key}`, removed with `DELETE` and probed
//! with `HEAD`. When the store answers a PUT with a JSON body carrying `url`, that
//! URL is used as the durable reference; otherwise `{endpoint}/{key}` is.

use crate::keys::validate_key;
use crate::traits::{Storage, StorageError, StorageResult, StoredObject};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use std::time::Duration;

/// Storage backed by a plain HTTP object endpoint.
#[derive(Clone)]
pub struct HttpStorage {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl std::fmt::Debug for HttpStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpStorage")
            .field("endpoint", &self.endpoint)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl HttpStorage {
    pub fn new(
        endpoint: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> StorageResult<Self> {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(StorageError::ConfigError(format!(
                "Storage endpoint must be an http(s) URL: {}",
                endpoint
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StorageError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint,
            token,
        })
    }

    fn object_url(&self, key: &str) -> String {
        let encoded: Vec<String> = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/{}", self.endpoint, encoded.join("/"))
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

#[async_trait]
impl Storage for HttpStorage {
    async fn put_object(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StorageResult<StoredObject> {
        validate_key(key)?;
        let url = self.object_url(key);
        let size = data.len();
        let start = std::time::Instant::now();

        let response = self
            .authorize(self.client.put(&url))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| StorageError::UploadFailed(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(key = %key, status = %status, "HTTP storage upload rejected");
            return Err(StorageError::UploadFailed(format!(
                "Store returned {}: {}",
                status.as_u16(),
                body.trim()
            )));
        }

        let body = response.bytes().await.unwrap_or_default();
        let durable = serde_json::from_slice::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("url").and_then(|u| u.as_str()).map(String::from))
            .unwrap_or(url);

        tracing::info!(
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "HTTP storage upload successful"
        );

        Ok(StoredObject {
            key: key.to_string(),
            url: durable,
        })
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        let url = self.object_url(key);
        let response = self
            .authorize(self.client.delete(&url))
            .send()
            .await
            .map_err(|e| StorageError::DeleteFailed(format!("Request to {} failed: {}", url, e)))?;

        match response.status() {
            s if s.is_success() || s == StatusCode::NOT_FOUND => {
                tracing::info!(key = %key, "HTTP storage delete successful");
                Ok(())
            }
            s => Err(StorageError::DeleteFailed(format!(
                "Store returned {} deleting {}",
                s.as_u16(),
                key
            ))),
        }
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        validate_key(key)?;
        let url = self.object_url(key);
        let response = self
            .authorize(self.client.head(&url))
            .send()
            .await
            .map_err(|e| StorageError::BackendError(format!("Request to {} failed: {}", url, e)))?;

        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            s => Err(StorageError::BackendError(format!(
                "Store returned {} probing {}",
                s.as_u16(),
                key
            ))),
        }
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Http
    }
}
