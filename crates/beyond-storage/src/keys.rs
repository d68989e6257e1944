//! Shared key generation for storage backends.
//!
//! Key format: `content-images/{unix_millis}-{short_id}-{sanitized filename}`.

use uuid::Uuid;

use crate::traits::{StorageError, StorageResult};

/// Prefix for images pre-uploaded on behalf of content submissions.
pub const CONTENT_IMAGES_PREFIX: &str = "content-images";

/// Reduce a user-supplied file name to a safe key segment.
pub fn sanitize_filename(filename: &str) -> String {
    const MAX: usize = 255;
    let path = std::path::Path::new(filename);
    let base = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);
    if base.contains("..") {
        return "invalid_filename".to_string();
    }
    let s: String = base
        .chars()
        .take(MAX)
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if s.trim().is_empty() || s.len() < 3 {
        "file".to_string()
    } else {
        s
    }
}

/// Generate a unique key for an asset under `prefix`.
pub fn generate_asset_key(prefix: &str, filename: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let id = Uuid::new_v4().simple().to_string();
    format!(
        "{}/{}-{}-{}",
        prefix.trim_matches('/'),
        millis,
        &id[..8],
        sanitize_filename(filename)
    )
}

/// Reject keys that could escape the store root.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() || key.contains("..") || key.starts_with('/') || key.contains('\\') {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("my photo (1).png"), "my_photo__1_.png");
        assert_eq!(sanitize_filename("/etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("a"), "file");
        assert_eq!(sanitize_filename("..png"), "invalid_filename");
    }

    #[test]
    fn test_generate_asset_key() {
        let key = generate_asset_key(CONTENT_IMAGES_PREFIX, "cat pic.jpg");
        assert!(key.starts_with("content-images/"));
        assert!(key.ends_with("-cat_pic.jpg"));
        assert!(validate_key(&key).is_ok());
        assert_ne!(key, generate_asset_key(CONTENT_IMAGES_PREFIX, "cat pic.jpg"));
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("content-images/1-a.png").is_ok());
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("").is_err());
    }
}
