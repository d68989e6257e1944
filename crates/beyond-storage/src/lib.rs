//! Beyond Storage Library
//!
//! This crate provides the binary asset store used to pre-upload images before
//! their metadata is submitted. It includes the Storage trait and implementations
//! for the local filesystem and an HTTP object endpoint.
//!
//! # Storage key format
//!
//! Pre-uploaded assets are stored under `content-images/{unix_millis}-{short_id}-{filename}`.
//! Keys must not contain `..` or a leading `/`. Key generation is centralized in the
//! `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-http")]
pub mod http;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use beyond_core::StorageBackend;
pub use factory::create_storage;
#[cfg(feature = "storage-http")]
pub use http::HttpStorage;
pub use keys::{generate_asset_key, sanitize_filename, CONTENT_IMAGES_PREFIX};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use traits::{Storage, StorageError, StorageResult, StoredObject};
