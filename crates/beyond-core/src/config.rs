//! Configuration module
//!
//! Client configuration for the submission pipeline: content API location, token
//! source, asset size ceilings, image upload strategy and the binary store backend.

use std::env;
use std::str::FromStr;

use crate::storage_types::StorageBackend;

const MAX_IMAGE_SIZE_MB: u64 = 10;
const MAX_VIDEO_SIZE_MB: u64 = 100;
const MAX_CHANNEL_PICTURE_SIZE_MB: u64 = 5;
const HTTP_TIMEOUT_SECS: u64 = 300;

const MIB: u64 = 1024 * 1024;

/// Per-kind byte ceilings applied when a file is selected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AssetLimits {
    pub max_image_bytes: u64,
    pub max_video_bytes: u64,
    pub max_channel_picture_bytes: u64,
}

impl Default for AssetLimits {
    fn default() -> Self {
        Self {
            max_image_bytes: MAX_IMAGE_SIZE_MB * MIB,
            max_video_bytes: MAX_VIDEO_SIZE_MB * MIB,
            max_channel_picture_bytes: MAX_CHANNEL_PICTURE_SIZE_MB * MIB,
        }
    }
}

/// How headline and article images reach the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageUploadStrategy {
    /// Upload to the binary store first and send the durable URL.
    PreUpload,
    /// Send the image bytes inside the multipart submission.
    Inline,
}

impl FromStr for ImageUploadStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pre-upload" | "preupload" | "store" => Ok(ImageUploadStrategy::PreUpload),
            "inline" | "multipart" => Ok(ImageUploadStrategy::Inline),
            _ => Err(anyhow::anyhow!("Invalid image upload strategy: {}", s)),
        }
    }
}

/// Client configuration
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub api_prefix: String,
    pub http_timeout_secs: u64,
    // Token sources, in order of preference: file, then static token
    pub api_token: Option<String>,
    pub token_file: Option<String>,
    pub limits: AssetLimits,
    pub image_strategy: ImageUploadStrategy,
    // Binary store configuration
    pub storage_backend: StorageBackend,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    pub storage_http_endpoint: Option<String>,
    pub storage_http_token: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000".to_string(),
            api_prefix: "/api".to_string(),
            http_timeout_secs: HTTP_TIMEOUT_SECS,
            api_token: None,
            token_file: None,
            limits: AssetLimits::default(),
            image_strategy: ImageUploadStrategy::PreUpload,
            storage_backend: StorageBackend::Local,
            local_storage_path: None,
            local_storage_base_url: None,
            storage_http_endpoint: None,
            storage_http_token: None,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let api_base_url = env::var("BEYOND_API_URL")
            .or_else(|_| env::var("API_URL"))
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();

        let api_prefix = env::var("BEYOND_API_PREFIX").unwrap_or_else(|_| "/api".to_string());

        let http_timeout_secs = env::var("BEYOND_HTTP_TIMEOUT_SECS")
            .unwrap_or_else(|_| HTTP_TIMEOUT_SECS.to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("BEYOND_HTTP_TIMEOUT_SECS must be a valid number"))?;

        let max_image_mb: u64 = env::var("MAX_IMAGE_SIZE_MB")
            .unwrap_or_else(|_| MAX_IMAGE_SIZE_MB.to_string())
            .parse()
            .unwrap_or(MAX_IMAGE_SIZE_MB);

        let max_video_mb: u64 = env::var("MAX_VIDEO_SIZE_MB")
            .unwrap_or_else(|_| MAX_VIDEO_SIZE_MB.to_string())
            .parse()
            .unwrap_or(MAX_VIDEO_SIZE_MB);

        let image_strategy = env::var("IMAGE_UPLOAD_STRATEGY")
            .unwrap_or_else(|_| "pre-upload".to_string())
            .parse()?;

        let storage_backend = env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "local".to_string())
            .parse()?;

        let config = ClientConfig {
            api_base_url,
            api_prefix,
            http_timeout_secs,
            api_token: non_empty_var("BEYOND_API_TOKEN").or_else(|| non_empty_var("JWT_TOKEN")),
            token_file: non_empty_var("BEYOND_TOKEN_FILE"),
            limits: AssetLimits {
                max_image_bytes: mib_to_bytes("MAX_IMAGE_SIZE_MB", max_image_mb)?,
                max_video_bytes: mib_to_bytes("MAX_VIDEO_SIZE_MB", max_video_mb)?,
                ..AssetLimits::default()
            },
            image_strategy,
            storage_backend,
            local_storage_path: non_empty_var("LOCAL_STORAGE_PATH"),
            local_storage_base_url: non_empty_var("LOCAL_STORAGE_BASE_URL"),
            storage_http_endpoint: non_empty_var("STORAGE_HTTP_ENDPOINT"),
            storage_http_token: non_empty_var("STORAGE_HTTP_TOKEN"),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(anyhow::anyhow!(
                "BEYOND_API_URL must be an http(s) URL, got {}",
                self.api_base_url
            ));
        }

        if !self.api_prefix.is_empty() && !self.api_prefix.starts_with('/') {
            return Err(anyhow::anyhow!("BEYOND_API_PREFIX must start with '/'"));
        }

        if self.limits.max_image_bytes == 0 || self.limits.max_video_bytes == 0 {
            return Err(anyhow::anyhow!(
                "MAX_IMAGE_SIZE_MB and MAX_VIDEO_SIZE_MB must be greater than zero"
            ));
        }

        if self.image_strategy == ImageUploadStrategy::PreUpload {
            match self.storage_backend {
                StorageBackend::Local => {
                    if self.local_storage_path.is_none() || self.local_storage_base_url.is_none() {
                        return Err(anyhow::anyhow!(
                            "STORAGE_BACKEND=local requires LOCAL_STORAGE_PATH and LOCAL_STORAGE_BASE_URL"
                        ));
                    }
                }
                StorageBackend::Http => {
                    if self.storage_http_endpoint.is_none() {
                        return Err(anyhow::anyhow!(
                            "STORAGE_BACKEND=http requires STORAGE_HTTP_ENDPOINT"
                        ));
                    }
                }
            }
        }

        Ok(())
    }
}

fn mib_to_bytes(var: &str, mib: u64) -> Result<u64, anyhow::Error> {
    mib.checked_mul(MIB)
        .ok_or_else(|| anyhow::anyhow!("{} is too large: {} MiB", var, mib))
}
