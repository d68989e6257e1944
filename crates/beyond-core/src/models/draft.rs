//! Submission drafts
//!
//! A draft is a tagged variant over the three content kinds, each with a fixed
//! field schema and narrow setters. The orchestrator only ever reads a draft; the
//! owner resets it after a successful submission.

use std::sync::atomic::{AtomicBool, Ordering};

use validator::Validate;

use super::asset::{AssetHandle, AssetPolicy};
use super::media::ContentKind;
use super::preview::PreviewRegistry;
use super::tags::TagSet;
use crate::config::AssetLimits;
use crate::error::FieldErrors;
use crate::validation::read_time_minutes;

/// Short breaking-news item.
#[derive(Debug, Validate)]
pub struct HeadlineDraft {
    #[validate(
        custom(function = "crate::validation::not_blank"),
        length(max = 180, message = "must be at most 180 characters")
    )]
    message: String,
    image: AssetHandle,
    is_just_in: bool,
    tags: TagSet,
}

impl HeadlineDraft {
    pub fn new(limits: &AssetLimits, previews: &PreviewRegistry) -> Self {
        Self {
            message: String::new(),
            image: AssetHandle::new(AssetPolicy::image(limits), previews.clone()),
            is_just_in: true,
            tags: TagSet::new(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
    }

    pub fn is_just_in(&self) -> bool {
        self.is_just_in
    }

    pub fn set_just_in(&mut self, is_just_in: bool) {
        self.is_just_in = is_just_in;
    }

    pub fn image(&self) -> &AssetHandle {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut AssetHandle {
        &mut self.image
    }

    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    pub fn tags_mut(&mut self) -> &mut TagSet {
        &mut self.tags
    }

    fn check(&self) -> FieldErrors {
        match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(errors) => errors.into(),
        }
    }

    fn reset(&mut self) {
        self.message.clear();
        self.image.clear();
        self.is_just_in = true;
        self.tags.clear();
    }
}

/// Long-form article with a teaser.
#[derive(Debug, Validate)]
pub struct ArticleDraft {
    #[validate(custom(function = "crate::validation::not_blank"))]
    title: String,
    #[validate(custom(function = "crate::validation::not_blank"))]
    preview_content: String,
    #[validate(custom(function = "crate::validation::not_blank"))]
    full_content: String,
    preview_image: AssetHandle,
    tags: TagSet,
}

impl ArticleDraft {
    pub fn new(limits: &AssetLimits, previews: &PreviewRegistry) -> Self {
        Self {
            title: String::new(),
            preview_content: String::new(),
            full_content: String::new(),
            preview_image: AssetHandle::new(AssetPolicy::image(limits), previews.clone()),
            tags: TagSet::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn preview_content(&self) -> &str {
        &self.preview_content
    }

    pub fn set_preview_content(&mut self, content: impl Into<String>) {
        self.preview_content = content.into();
    }

    pub fn full_content(&self) -> &str {
        &self.full_content
    }

    pub fn set_full_content(&mut self, content: impl Into<String>) {
        self.full_content = content.into();
    }

    /// Minutes to read the full content.
    pub fn read_time(&self) -> u32 {
        read_time_minutes(&self.full_content)
    }

    pub fn preview_image(&self) -> &AssetHandle {
        &self.preview_image
    }

    pub fn preview_image_mut(&mut self) -> &mut AssetHandle {
        &mut self.preview_image
    }

    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    pub fn tags_mut(&mut self) -> &mut TagSet {
        &mut self.tags
    }

    fn check(&self) -> FieldErrors {
        match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(errors) => errors.into(),
        }
    }

    fn reset(&mut self) {
        self.title.clear();
        self.preview_content.clear();
        self.full_content.clear();
        self.preview_image.clear();
        self.tags.clear();
    }
}

/// Video upload with a thumbnail.
#[derive(Debug, Validate)]
pub struct VideoDraft {
    #[validate(custom(function = "crate::validation::not_blank"))]
    title: String,
    description: String,
    video: AssetHandle,
    thumbnail: AssetHandle,
    tags: TagSet,
}

impl VideoDraft {
    pub fn new(limits: &AssetLimits, previews: &PreviewRegistry) -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            video: AssetHandle::new(AssetPolicy::video(limits), previews.clone()),
            thumbnail: AssetHandle::new(AssetPolicy::image(limits), previews.clone()),
            tags: TagSet::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn video(&self) -> &AssetHandle {
        &self.video
    }

    pub fn video_mut(&mut self) -> &mut AssetHandle {
        &mut self.video
    }

    pub fn thumbnail(&self) -> &AssetHandle {
        &self.thumbnail
    }

    pub fn thumbnail_mut(&mut self) -> &mut AssetHandle {
        &mut self.thumbnail
    }

    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    pub fn tags_mut(&mut self) -> &mut TagSet {
        &mut self.tags
    }

    fn check(&self) -> FieldErrors {
        let mut errors = match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(errors) => errors.into(),
        };
        if !self.video.is_selected() {
            errors.add("video", "is required");
        }
        if !self.thumbnail.is_selected() {
            errors.add("thumbnail", "is required");
        }
        errors
    }

    fn reset(&mut self) {
        self.title.clear();
        self.description.clear();
        self.video.clear();
        self.thumbnail.clear();
        self.tags.clear();
    }
}

#[derive(Debug)]
pub enum DraftBody {
    Headline(HeadlineDraft),
    Article(ArticleDraft),
    Video(VideoDraft),
}

/// Content item under composition.
#[derive(Debug)]
pub struct Draft {
    body: DraftBody,
    in_flight: AtomicBool,
}

/// Marks a draft as having a submission in flight until dropped.
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl Draft {
    /// Empty draft of the given kind.
    pub fn new(kind: ContentKind, limits: &AssetLimits, previews: &PreviewRegistry) -> Self {
        let body = match kind {
            ContentKind::Headline => DraftBody::Headline(HeadlineDraft::new(limits, previews)),
            ContentKind::Article => DraftBody::Article(ArticleDraft::new(limits, previews)),
            ContentKind::Video => DraftBody::Video(VideoDraft::new(limits, previews)),
        };
        Self {
            body,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn kind(&self) -> ContentKind {
        match &self.body {
            DraftBody::Headline(_) => ContentKind::Headline,
            DraftBody::Article(_) => ContentKind::Article,
            DraftBody::Video(_) => ContentKind::Video,
        }
    }

    pub fn body(&self) -> &DraftBody {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut DraftBody {
        &mut self.body
    }

    pub fn as_headline_mut(&mut self) -> Option<&mut HeadlineDraft> {
        match &mut self.body {
            DraftBody::Headline(draft) => Some(draft),
            _ => None,
        }
    }

    pub fn as_article_mut(&mut self) -> Option<&mut ArticleDraft> {
        match &mut self.body {
            DraftBody::Article(draft) => Some(draft),
            _ => None,
        }
    }

    pub fn as_video_mut(&mut self) -> Option<&mut VideoDraft> {
        match &mut self.body {
            DraftBody::Video(draft) => Some(draft),
            _ => None,
        }
    }

    /// Check that every field required by the content kind is filled in.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let errors = match &self.body {
            DraftBody::Headline(draft) => draft.check(),
            DraftBody::Article(draft) => draft.check(),
            DraftBody::Video(draft) => draft.check(),
        };
        errors.into_result()
    }

    /// Clear every field and release all asset previews.
    pub fn reset(&mut self) {
        match &mut self.body {
            DraftBody::Headline(draft) => draft.reset(),
            DraftBody::Article(draft) => draft.reset(),
            DraftBody::Video(draft) => draft.reset(),
        }
    }

    /// Claim the draft for one submission attempt. `None` if one is already running.
    pub fn try_begin_attempt(&self) -> Option<InFlightGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard {
                flag: &self.in_flight,
            })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}
