use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Declared kind of a selected binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// MIME prefix every file of this kind must carry.
    pub fn mime_prefix(&self) -> &'static str {
        match self {
            MediaKind::Image => "image/",
            MediaKind::Video => "video/",
        }
    }
}

impl Display for MediaKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// Content kinds accepted by the content API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Headline,
    Article,
    Video,
}

impl Display for ContentKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ContentKind::Headline => write!(f, "headline"),
            ContentKind::Article => write!(f, "article"),
            ContentKind::Video => write!(f, "video"),
        }
    }
}

impl FromStr for ContentKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "headline" | "content" => Ok(ContentKind::Headline),
            "article" | "articles" => Ok(ContentKind::Article),
            "video" | "videos" => Ok(ContentKind::Video),
            _ => Err(anyhow::anyhow!("Invalid content kind: {}", s)),
        }
    }
}

/// Best-effort MIME type for a file name, by extension.
pub fn content_type_for_extension(filename: &str) -> Option<&'static str> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())?;

    let content_type = match extension.as_str() {
        // Images
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        // Videos
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "m4v" => "video/x-m4v",
        _ => return None,
    };
    Some(content_type)
}
