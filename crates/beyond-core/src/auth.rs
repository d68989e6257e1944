//! Identity token providers
//!
//! The pipeline never reaches for an ambient "current user". Every attempt is
//! handed a [`TokenProvider`] that yields the bearer token for the signed-in
//! principal, optionally forcing a refresh when the server rejected the last one.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::config::ClientConfig;
use crate::error::SubmissionError;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("No signed-in principal")]
    NotSignedIn,

    #[error("Token acquisition failed: {0}")]
    Acquisition(String),
}

impl From<AuthError> for SubmissionError {
    fn from(err: AuthError) -> Self {
        SubmissionError::AuthUnavailable(err.to_string())
    }
}

/// Source of bearer tokens for the active principal.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Return the current token. With `force_refresh` the provider must not hand
    /// back a cached value.
    async fn get_token(&self, force_refresh: bool) -> Result<String, AuthError>;
}

/// Fixed token, typically read from the environment.
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("token", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn get_token(&self, _force_refresh: bool) -> Result<String, AuthError> {
        if self.token.trim().is_empty() {
            return Err(AuthError::NotSignedIn);
        }
        Ok(self.token.clone())
    }
}

/// Token kept in a file that an external sign-in helper rewrites on refresh.
///
/// The first read is cached; a forced refresh re-reads the file.
pub struct FileTokenProvider {
    path: PathBuf,
    cached: Mutex<Option<String>>,
}

impl FileTokenProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: Mutex::new(None),
        }
    }

    async fn read_token(&self) -> Result<String, AuthError> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AuthError::NotSignedIn
            } else {
                AuthError::Acquisition(format!(
                    "Failed to read token file {}: {}",
                    self.path.display(),
                    e
                ))
            }
        })?;

        let token = raw.trim().to_string();
        if token.is_empty() {
            return Err(AuthError::NotSignedIn);
        }
        Ok(token)
    }
}

#[async_trait]
impl TokenProvider for FileTokenProvider {
    async fn get_token(&self, force_refresh: bool) -> Result<String, AuthError> {
        let mut cached = self.cached.lock().await;
        if !force_refresh {
            if let Some(token) = cached.as_ref() {
                return Ok(token.clone());
            }
        }

        let token = self.read_token().await?;
        tracing::debug!(path = %self.path.display(), force_refresh, "Loaded token from file");
        *cached = Some(token.clone());
        Ok(token)
    }
}

/// Provider used when nobody is signed in.
pub struct NoTokenProvider;

#[async_trait]
impl TokenProvider for NoTokenProvider {
    async fn get_token(&self, _force_refresh: bool) -> Result<String, AuthError> {
        Err(AuthError::NotSignedIn)
    }
}

/// Pick a provider from configuration: token file first, then a static token.
pub fn provider_from_config(config: &ClientConfig) -> Arc<dyn TokenProvider> {
    if let Some(path) = &config.token_file {
        return Arc::new(FileTokenProvider::new(path));
    }
    match &config.api_token {
        Some(token) => Arc::new(StaticTokenProvider::new(token.clone())),
        None => Arc::new(NoTokenProvider),
    }
}
