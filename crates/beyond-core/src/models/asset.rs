//! Local asset handles
//!
//! [`AssetHandle::select`] is the single entry point for attaching a file to a
//! draft field and [`AssetHandle::release`] the single point where its preview is
//! revoked. Replacing, clearing or dropping a handle all go through `release`.

use std::path::Path;

use anyhow::Context;
use bytes::Bytes;

use super::media::{content_type_for_extension, MediaKind};
use super::preview::{PreviewRef, PreviewRegistry};
use crate::config::AssetLimits;
use crate::error::AssetValidationError;

/// A user-selected binary blob.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl SelectedFile {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Read a file from disk, inferring its MIME type from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path
            .components()
            .any(|c| c == std::path::Component::ParentDir)
        {
            return Err(anyhow::anyhow!("Invalid input: {}", path.display()));
        }

        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.bin")
            .to_string();

        let content_type = content_type_for_extension(&name)
            .unwrap_or("application/octet-stream")
            .to_string();

        Ok(Self::new(name, content_type, data))
    }
}

/// What a handle accepts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetPolicy {
    pub kind: MediaKind,
    pub max_bytes: u64,
    /// Exact MIME types allowed on top of the kind prefix, if restricted.
    pub allowed_types: Option<Vec<String>>,
}

impl AssetPolicy {
    pub fn image(limits: &AssetLimits) -> Self {
        Self {
            kind: MediaKind::Image,
            max_bytes: limits.max_image_bytes,
            allowed_types: None,
        }
    }

    pub fn video(limits: &AssetLimits) -> Self {
        Self {
            kind: MediaKind::Video,
            max_bytes: limits.max_video_bytes,
            allowed_types: None,
        }
    }

    /// Channel pictures: JPEG, PNG or GIF only.
    pub fn channel_picture(limits: &AssetLimits) -> Self {
        Self {
            kind: MediaKind::Image,
            max_bytes: limits.max_channel_picture_bytes,
            allowed_types: Some(vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/gif".to_string(),
            ]),
        }
    }

    pub fn check(&self, file: &SelectedFile) -> Result<(), AssetValidationError> {
        let content_type = file.content_type.trim().to_lowercase();
        let prefix = self.kind.mime_prefix();

        if !content_type.starts_with(prefix) || content_type.len() == prefix.len() {
            return Err(AssetValidationError::WrongKind {
                content_type: file.content_type.clone(),
                expected: prefix,
            });
        }

        if let Some(allowed) = &self.allowed_types {
            if !allowed.iter().any(|ct| ct == &content_type) {
                return Err(AssetValidationError::UnsupportedType {
                    content_type: file.content_type.clone(),
                    allowed: allowed.clone(),
                });
            }
        }

        let size = file.size();
        if size == 0 {
            return Err(AssetValidationError::EmptyFile {
                name: file.name.clone(),
            });
        }
        if size > self.max_bytes {
            return Err(AssetValidationError::TooLarge {
                kind: self.kind,
                size,
                max: self.max_bytes,
            });
        }

        Ok(())
    }
}

/// A draft field holding zero or one selected file plus its preview.
pub struct AssetHandle {
    policy: AssetPolicy,
    previews: PreviewRegistry,
    file: Option<SelectedFile>,
    preview: Option<PreviewRef>,
}

impl AssetHandle {
    pub fn new(policy: AssetPolicy, previews: PreviewRegistry) -> Self {
        Self {
            policy,
            previews,
            file: None,
            preview: None,
        }
    }

    /// Validate and attach a file. On error the previous selection is untouched.
    pub fn select(&mut self, file: SelectedFile) -> Result<(), AssetValidationError> {
        self.policy.check(&file)?;

        self.release();
        let preview = self.previews.create(file.data.clone());
        tracing::debug!(
            kind = %self.policy.kind,
            name = %file.name,
            size_bytes = file.size(),
            preview = %preview.url(),
            "Asset selected"
        );
        self.preview = Some(preview);
        self.file = Some(file);
        Ok(())
    }

    /// Revoke the current preview, if any. Idempotent.
    pub fn release(&mut self) {
        if let Some(preview) = self.preview.take() {
            self.previews.revoke(&preview);
        }
    }

    /// Release the preview and forget the selected file.
    pub fn clear(&mut self) {
        self.release();
        self.file = None;
    }

    pub fn file(&self) -> Option<&SelectedFile> {
        self.file.as_ref()
    }

    pub fn is_selected(&self) -> bool {
        self.file.is_some()
    }

    pub fn preview(&self) -> Option<&PreviewRef> {
        self.preview.as_ref()
    }

    pub fn policy(&self) -> &AssetPolicy {
        &self.policy
    }
}

impl Drop for AssetHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for AssetHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetHandle")
            .field("kind", &self.policy.kind)
            .field("file", &self.file.as_ref().map(|file| &file.name))
            .field("preview", &self.preview)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: usize = 1024 * 1024;

    fn video_handle(previews: &PreviewRegistry) -> AssetHandle {
        AssetHandle::new(AssetPolicy::video(&AssetLimits::default()), previews.clone())
    }

    fn image_handle(previews: &PreviewRegistry) -> AssetHandle {
        AssetHandle::new(AssetPolicy::image(&AssetLimits::default()), previews.clone())
    }

    #[test]
    fn test_select_creates_preview() {
        let previews = PreviewRegistry::new();
        let mut handle = image_handle(&previews);

        handle
            .select(SelectedFile::new("a.png", "image/png", vec![1u8, 2, 3]))
            .unwrap();

        let preview = handle.preview().unwrap().clone();
        assert_eq!(previews.resolve(&preview).unwrap().as_ref(), &[1u8, 2, 3]);
        assert_eq!(handle.file().unwrap().name, "a.png");
    }

    #[test]
    fn test_oversized_video_keeps_previous_selection() {
        let previews = PreviewRegistry::new();
        let mut handle = video_handle(&previews);
        handle
            .select(SelectedFile::new("small.mp4", "video/mp4", vec![0u8; 1024]))
            .unwrap();
        let before = handle.preview().cloned();

        let err = handle
            .select(SelectedFile::new(
                "huge.mp4",
                "video/mp4",
                vec![0u8; 101 * MIB],
            ))
            .unwrap_err();

        assert!(matches!(err, AssetValidationError::TooLarge { .. }));
        assert_eq!(handle.file().unwrap().name, "small.mp4");
        assert_eq!(handle.preview().cloned(), before);
        assert_eq!(previews.live_count(), 1);
    }

    #[test]
    fn test_wrong_kind_rejected() {
        let previews = PreviewRegistry::new();
        let mut handle = video_handle(&previews);
        let err = handle
            .select(SelectedFile::new("a.png", "image/png", vec![1u8]))
            .unwrap_err();
        assert!(matches!(err, AssetValidationError::WrongKind { .. }));
        assert!(!handle.is_selected());
        assert_eq!(previews.live_count(), 0);
    }

    #[test]
    fn test_empty_file_rejected() {
        let previews = PreviewRegistry::new();
        let mut handle = image_handle(&previews);
        let err = handle
            .select(SelectedFile::new("a.png", "image/png", Vec::<u8>::new()))
            .unwrap_err();
        assert!(matches!(err, AssetValidationError::EmptyFile { .. }));
    }

    #[test]
    fn test_reselect_releases_old_preview() {
        let previews = PreviewRegistry::new();
        let mut handle = image_handle(&previews);

        handle
            .select(SelectedFile::new("1.png", "image/png", vec![1u8]))
            .unwrap();
        let first = handle.preview().unwrap().clone();

        for i in 0..5u8 {
            handle
                .select(SelectedFile::new("n.png", "image/png", vec![i + 2]))
                .unwrap();
        }

        assert!(previews.resolve(&first).is_none());
        assert_eq!(previews.live_count(), 1);
    }

    #[test]
    fn test_release_is_idempotent_and_drop_releases() {
        let previews = PreviewRegistry::new();
        {
            let mut handle = image_handle(&previews);
            handle
                .select(SelectedFile::new("a.gif", "image/gif", vec![1u8]))
                .unwrap();
            handle.release();
            handle.release();
            assert_eq!(previews.live_count(), 0);
            assert!(handle.is_selected());

            handle
                .select(SelectedFile::new("b.gif", "image/gif", vec![1u8]))
                .unwrap();
            assert_eq!(previews.live_count(), 1);
        }
        assert_eq!(previews.live_count(), 0);
    }

    #[test]
    fn test_clear_forgets_file() {
        let previews = PreviewRegistry::new();
        let mut handle = image_handle(&previews);
        handle
            .select(SelectedFile::new("a.png", "image/png", vec![1u8]))
            .unwrap();
        handle.clear();
        assert!(!handle.is_selected());
        assert!(handle.preview().is_none());
        assert_eq!(previews.live_count(), 0);
    }

    #[test]
    fn test_channel_picture_policy() {
        let policy = AssetPolicy::channel_picture(&AssetLimits::default());
        assert!(policy
            .check(&SelectedFile::new("me.png", "image/png", vec![1u8]))
            .is_ok());
        assert!(matches!(
            policy.check(&SelectedFile::new("me.webp", "image/webp", vec![1u8])),
            Err(AssetValidationError::UnsupportedType { .. })
        ));
        assert!(matches!(
            policy.check(&SelectedFile::new("me.png", "image/png", vec![0u8; 6 * MIB])),
            Err(AssetValidationError::TooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn test_from_path_infers_content_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"fake video").unwrap();

        let file = SelectedFile::from_path(&path).await.unwrap();
        assert_eq!(file.name, "clip.mp4");
        assert_eq!(file.content_type, "video/mp4");
        assert_eq!(file.size(), 10);
    }
}
