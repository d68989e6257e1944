//! Helpers for the `beyond` binary: draft construction from command-line values,
//! terminal rendering of submission state and tracing setup.

use std::path::Path;

use anyhow::Context;
use beyond_core::{
    AssetHandle, AssetLimits, ContentKind, Draft, ErrorMetadata, PreviewRegistry, SelectedFile,
    SubmissionError,
};
use beyond_pipeline::SubmissionState;
use serde_json::{json, Value};

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays JSON.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

/// Read `path` and select it into `handle`, reporting rejections the way the form would.
pub async fn select_file(handle: &mut AssetHandle, path: &Path) -> anyhow::Result<()> {
    let file = SelectedFile::from_path(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    handle
        .select(file)
        .map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e.client_message()))
}

fn add_tags(tags: &mut beyond_core::TagSet, raw: &[String]) {
    for entry in raw {
        tags.extend_csv(entry);
    }
}

pub async fn headline_draft(
    limits: &AssetLimits,
    previews: &PreviewRegistry,
    message: &str,
    image: Option<&Path>,
    is_just_in: bool,
    tags: &[String],
) -> anyhow::Result<Draft> {
    let mut draft = Draft::new(ContentKind::Headline, limits, previews);
    if let Some(headline) = draft.as_headline_mut() {
        headline.set_message(message);
        headline.set_just_in(is_just_in);
        add_tags(headline.tags_mut(), tags);
        if let Some(path) = image {
            select_file(headline.image_mut(), path).await?;
        }
    }
    Ok(draft)
}

pub async fn article_draft(
    limits: &AssetLimits,
    previews: &PreviewRegistry,
    title: &str,
    preview_content: &str,
    full_content: &str,
    preview_image: Option<&Path>,
    tags: &[String],
) -> anyhow::Result<Draft> {
    let mut draft = Draft::new(ContentKind::Article, limits, previews);
    if let Some(article) = draft.as_article_mut() {
        article.set_title(title);
        article.set_preview_content(preview_content);
        article.set_full_content(full_content);
        add_tags(article.tags_mut(), tags);
        if let Some(path) = preview_image {
            select_file(article.preview_image_mut(), path).await?;
        }
    }
    Ok(draft)
}

pub async fn video_draft(
    limits: &AssetLimits,
    previews: &PreviewRegistry,
    title: &str,
    description: Option<&str>,
    video: &Path,
    thumbnail: &Path,
    tags: &[String],
) -> anyhow::Result<Draft> {
    let mut draft = Draft::new(ContentKind::Video, limits, previews);
    if let Some(v) = draft.as_video_mut() {
        v.set_title(title);
        v.set_description(description.unwrap_or_default());
        add_tags(v.tags_mut(), tags);
        select_file(v.video_mut(), video).await?;
        select_file(v.thumbnail_mut(), thumbnail).await?;
    }
    Ok(draft)
}

/// One status line for stderr.
pub fn render_state(state: &SubmissionState) -> String {
    match state {
        SubmissionState::Idle => "Ready".to_string(),
        SubmissionState::Validating => "Checking draft...".to_string(),
        SubmissionState::Submitting { progress } => format!("Publishing... {}%", progress),
        SubmissionState::Success(_) => "Published".to_string(),
        SubmissionState::Failed(e) => {
            format!("Failed: {}", truncate_string(&e.client_message(), 120))
        }
    }
}

/// JSON describing an error for stdout.
pub fn error_json(error: &SubmissionError) -> Value {
    let mut out = json!({
        "status": "failed",
        "error_code": error.error_code(),
        "message": error.client_message(),
        "recoverable": error.is_recoverable(),
        "suggested_action": error.suggested_action(),
    });
    if let (SubmissionError::Validation(fields), Some(obj)) = (error, out.as_object_mut()) {
        obj.insert("fields".to_string(), json!(fields));
    }
    out
}

/// JSON describing a terminal state for stdout.
pub fn outcome_json(state: &SubmissionState) -> Value {
    match state {
        SubmissionState::Success(ack) => json!({
            "status": "success",
            "acknowledgment": ack,
        }),
        SubmissionState::Failed(error) => error_json(error),
        other => json!({ "status": other.name() }),
    }
}
