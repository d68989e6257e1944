//! Beyond Core Library
//!
//! This crate provides the domain models, error types, configuration and validation
//! shared by every Beyond component: tag sets, local asset handles with revocable
//! previews, per-kind submission drafts, and the token provider seam used to
//! authenticate requests.

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use auth::{
    provider_from_config, AuthError, FileTokenProvider, NoTokenProvider, StaticTokenProvider,
    TokenProvider,
};
pub use config::{AssetLimits, ClientConfig, ImageUploadStrategy};
pub use error::{AssetValidationError, ErrorMetadata, FieldErrors, LogLevel, SubmissionError};
pub use models::{
    ArticleDraft, AssetHandle, AssetPolicy, ContentKind, Draft, DraftBody, HeadlineDraft,
    InFlightGuard, MediaKind, PreviewRef, PreviewRegistry, SelectedFile, TagSet, VideoDraft,
};
pub use storage_types::StorageBackend;
