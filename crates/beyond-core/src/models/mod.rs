//! Domain models for content composition
//!
//! A [`Draft`] is the mutable aggregate a creator edits before submitting. It owns
//! a [`TagSet`] and one or more [`AssetHandle`]s whose previews live in a shared
//! [`PreviewRegistry`].

pub mod asset;
pub mod draft;
pub mod media;
pub mod preview;
pub mod tags;

pub use asset::{AssetHandle, AssetPolicy, SelectedFile};
pub use draft::{ArticleDraft, Draft, DraftBody, HeadlineDraft, InFlightGuard, VideoDraft};
pub use media::{content_type_for_extension, ContentKind, MediaKind};
pub use preview::{PreviewRef, PreviewRegistry};
pub use tags::TagSet;
