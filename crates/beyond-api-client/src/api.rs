//! Domain requests for the Beyond content API.
//!
//! Drafts are turned into `OutboundRequest`s here. Headline and article images
//! travel either as a durable URL from the asset store (JSON body) or as an
//! inline file part (multipart body). Videos are always multipart.

use beyond_core::{ArticleDraft, FieldErrors, HeadlineDraft, SubmissionError, VideoDraft};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::multipart::{FilePart, MultipartBody};
use crate::{Acknowledgment, ContentApiClient, OutboundRequest};

pub const CONTENT_PATH: &str = "/content";
pub const ARTICLES_PATH: &str = "/articles";
pub const VIDEOS_PATH: &str = "/videos";
pub const VERIFY_CREATOR_PATH: &str = "/creators/verify";
pub const CHANNEL_PICTURE_PATH: &str = "/creators/upload-channel-picture";

const HEADLINE_FALLBACK: &str = "Failed to create content";
const ARTICLE_FALLBACK: &str = "Failed to create article";
const VIDEO_FALLBACK: &str = "Failed to upload video";
const CHANNEL_PICTURE_FALLBACK: &str = "Failed to upload picture";
const VERIFY_FALLBACK: &str = "Failed to fetch user data";

/// How an optional image accompanies a headline or article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageField {
    Absent,
    /// Durable URL returned by the asset store.
    Stored(String),
    /// Bytes sent as a file part.
    Inline(FilePart),
}

/// Creator profile returned by `GET /creators/verify`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatorProfile {
    #[serde(default)]
    pub channel: Option<ChannelInfo>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

pub fn headline_request(draft: &HeadlineDraft, image: ImageField) -> OutboundRequest {
    let tags = draft.tags().list();
    match image {
        ImageField::Inline(file) => {
            let body = MultipartBody::new()
                .text("message", draft.message())
                .file("file", file)
                .text("isJustIn", draft.is_just_in().to_string())
                .repeated("tags", tags);
            OutboundRequest::multipart(CONTENT_PATH, body, HEADLINE_FALLBACK)
        }
        ImageField::Stored(url) => OutboundRequest::json(
            CONTENT_PATH,
            json!({
                "message": draft.message(),
                "picture": url,
                "isJustIn": draft.is_just_in(),
                "tags": tags,
            }),
            HEADLINE_FALLBACK,
        ),
        ImageField::Absent => OutboundRequest::json(
            CONTENT_PATH,
            json!({
                "message": draft.message(),
                "isJustIn": draft.is_just_in(),
                "tags": tags,
            }),
            HEADLINE_FALLBACK,
        ),
    }
}

pub fn article_request(draft: &ArticleDraft, image: ImageField) -> OutboundRequest {
    let tags = draft.tags().list();
    if let ImageField::Inline(file) = image {
        let body = MultipartBody::new()
            .text("title", draft.title())
            .text("previewContent", draft.preview_content())
            .text("fullContent", draft.full_content())
            .text("readTime", draft.read_time().to_string())
            .file("previewImage", file)
            .repeated("tags", tags);
        return OutboundRequest::multipart(ARTICLES_PATH, body, ARTICLE_FALLBACK);
    }

    let mut value = json!({
        "title": draft.title(),
        "previewContent": draft.preview_content(),
        "fullContent": draft.full_content(),
        "readTime": draft.read_time(),
        "tags": tags,
    });
    if let (ImageField::Stored(url), Some(obj)) = (image, value.as_object_mut()) {
        obj.insert("previewImage".to_string(), json!(url));
    }
    OutboundRequest::json(ARTICLES_PATH, value, ARTICLE_FALLBACK)
}

/// Both files must be selected; a missing one is reported per field.
pub fn video_request(draft: &VideoDraft) -> Result<OutboundRequest, SubmissionError> {
    let (video, thumbnail) = match (draft.video().file(), draft.thumbnail().file()) {
        (Some(v), Some(t)) => (v, t),
        (video, thumbnail) => {
            let mut errors = FieldErrors::new();
            if video.is_none() {
                errors.add("video", "is required");
            }
            if thumbnail.is_none() {
                errors.add("thumbnail", "is required");
            }
            return Err(SubmissionError::Validation(errors));
        }
    };

    let body = MultipartBody::new()
        .file("video", FilePart::from(video))
        .file("thumbnail", FilePart::from(thumbnail))
        .text("title", draft.title())
        .text("description", draft.description())
        .repeated("tags", draft.tags().list());
    Ok(OutboundRequest::multipart(VIDEOS_PATH, body, VIDEO_FALLBACK))
}

pub fn channel_picture_request(file: FilePart) -> OutboundRequest {
    let body = MultipartBody::new().file("channelPicture", file);
    OutboundRequest::multipart(CHANNEL_PICTURE_PATH, body, CHANNEL_PICTURE_FALLBACK)
}

/// Extract `pictureUrl` from a channel picture acknowledgment.
pub fn picture_url(ack: &Acknowledgment) -> Result<String, SubmissionError> {
    ack.value()
        .get("pictureUrl")
        .and_then(|u| u.as_str())
        .map(String::from)
        .ok_or_else(|| {
            SubmissionError::AssetUploadFailed(
                "Server accepted the picture but returned no pictureUrl".to_string(),
            )
        })
}

impl ContentApiClient {
    /// Fetch the signed-in creator's profile.
    pub async fn verify_creator(&self, token: &str) -> Result<CreatorProfile, SubmissionError> {
        self.get_json(VERIFY_CREATOR_PATH, token, VERIFY_FALLBACK)
            .await
    }
}
