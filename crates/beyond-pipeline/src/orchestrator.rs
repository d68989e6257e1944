//! Upload orchestrator
//!
//! Turns a validated draft into authenticated network operations:
//! token → asset pre-upload → metadata request → acknowledgment.

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use beyond_api_client::{
    article_request, channel_picture_request, headline_request, picture_url, video_request,
    Acknowledgment, ContentApiClient, CreatorProfile, FilePart, ImageField, OutboundRequest,
    ProgressSink,
};
use beyond_core::{
    AssetHandle, ClientConfig, Draft, DraftBody, FieldErrors, ImageUploadStrategy, SelectedFile,
    SubmissionError, TokenProvider,
};
use beyond_storage::{
    create_storage, generate_asset_key, Storage, StoredObject, CONTENT_IMAGES_PREFIX,
};

/// How headline and article images reach the server.
#[derive(Clone)]
pub enum ImageStrategy {
    /// Upload to the asset store first and submit the durable URL.
    PreUpload(Arc<dyn Storage>),
    /// Send image bytes inside the multipart submission.
    Inline,
}

impl std::fmt::Debug for ImageStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageStrategy::PreUpload(store) => {
                write!(f, "PreUpload({})", store.backend_type())
            }
            ImageStrategy::Inline => f.write_str("Inline"),
        }
    }
}

/// Performs the network side of a submission. Never mutates the draft.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    api: ContentApiClient,
    images: ImageStrategy,
}

impl Orchestrator {
    pub fn new(api: ContentApiClient, images: ImageStrategy) -> Self {
        Self { api, images }
    }

    pub async fn from_config(config: &ClientConfig) -> anyhow::Result<Self> {
        let api = ContentApiClient::from_config(config)?;
        let images = match config.image_strategy {
            ImageUploadStrategy::PreUpload => ImageStrategy::PreUpload(
                create_storage(config)
                    .await
                    .context("Failed to initialize asset store")?,
            ),
            ImageUploadStrategy::Inline => ImageStrategy::Inline,
        };
        Ok(Self::new(api, images))
    }

    pub fn api(&self) -> &ContentApiClient {
        &self.api
    }

    /// Submit a draft. Rejects a second concurrent call on the same draft.
    #[tracing::instrument(skip_all, fields(kind = %draft.kind()))]
    pub async fn submit(
        &self,
        draft: &Draft,
        tokens: &dyn TokenProvider,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<Acknowledgment, SubmissionError> {
        let _guard = draft
            .try_begin_attempt()
            .ok_or(SubmissionError::AttemptInFlight)?;
        let start = std::time::Instant::now();

        // 1. Acquire a bearer token
        let token = tokens.get_token(false).await?;

        // 2. Pre-upload images and compose the request
        let mut stored = Vec::new();
        let request = match self.compose(draft, &mut stored).await {
            Ok(request) => request,
            Err(e) => {
                self.discard_stored(&stored).await;
                return Err(e);
            }
        };

        // 3. Send, refreshing the token once on a 401
        let api = &self.api;
        let request_ref = &request;
        let result = with_token_refresh(tokens, token, |token| {
            let progress = progress.clone();
            async move { api.send(request_ref, &token, progress).await }
        })
        .await;

        // 4. Remove pre-uploaded objects nothing refers to
        match &result {
            Ok(_) => tracing::info!(
                path = %request.path,
                stored_assets = stored.len(),
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Submission acknowledged"
            ),
            Err(e) => {
                tracing::warn!(
                    path = %request.path,
                    error_type = e.error_type(),
                    error = %e,
                    "Submission failed"
                );
                self.discard_stored(&stored).await;
            }
        }

        result
    }

    /// Upload a new channel picture and return its URL.
    #[tracing::instrument(skip_all)]
    pub async fn upload_channel_picture(
        &self,
        picture: &AssetHandle,
        tokens: &dyn TokenProvider,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<String, SubmissionError> {
        let file = picture.file().ok_or_else(|| {
            let mut errors = FieldErrors::new();
            errors.add("channelPicture", "is required");
            SubmissionError::Validation(errors)
        })?;
        let request = channel_picture_request(FilePart::from(file));
        let token = tokens.get_token(false).await?;

        let api = &self.api;
        let request_ref = &request;
        let ack = with_token_refresh(tokens, token, |token| {
            let progress = progress.clone();
            async move { api.send(request_ref, &token, progress).await }
        })
        .await?;

        let url = picture_url(&ack)?;
        tracing::info!(picture_url = %url, "Channel picture updated");
        Ok(url)
    }

    /// Fetch the signed-in creator's profile.
    pub async fn verify_creator(
        &self,
        tokens: &dyn TokenProvider,
    ) -> Result<CreatorProfile, SubmissionError> {
        let token = tokens.get_token(false).await?;
        let api = &self.api;
        with_token_refresh(tokens, token, |token| async move {
            api.verify_creator(&token).await
        })
        .await
    }

    async fn compose(
        &self,
        draft: &Draft,
        stored: &mut Vec<StoredObject>,
    ) -> Result<OutboundRequest, SubmissionError> {
        match draft.body() {
            DraftBody::Headline(headline) => {
                let image = self.image_field(headline.image().file(), stored).await?;
                Ok(headline_request(headline, image))
            }
            DraftBody::Article(article) => {
                let image = self
                    .image_field(article.preview_image().file(), stored)
                    .await?;
                Ok(article_request(article, image))
            }
            DraftBody::Video(video) => video_request(video),
        }
    }

    async fn image_field(
        &self,
        file: Option<&SelectedFile>,
        stored: &mut Vec<StoredObject>,
    ) -> Result<ImageField, SubmissionError> {
        let Some(file) = file else {
            return Ok(ImageField::Absent);
        };
        match &self.images {
            ImageStrategy::Inline => Ok(ImageField::Inline(FilePart::from(file))),
            ImageStrategy::PreUpload(store) => {
                let key = generate_asset_key(CONTENT_IMAGES_PREFIX, &file.name);
                let object = store
                    .put_object(&key, file.data.clone(), &file.content_type)
                    .await
                    .map_err(|e| {
                        tracing::warn!(key = %key, error = %e, "Asset pre-upload failed");
                        SubmissionError::AssetUploadFailed(e.to_string())
                    })?;
                let url = object.url.clone();
                stored.push(object);
                Ok(ImageField::Stored(url))
            }
        }
    }

    async fn discard_stored(&self, stored: &[StoredObject]) {
        let ImageStrategy::PreUpload(store) = &self.images else {
            return;
        };
        for object in stored {
            if let Err(cleanup_err) = store.delete(&object.key).await {
                tracing::warn!(
                    error = %cleanup_err,
                    storage_key = %object.key,
                    "Failed to cleanup pre-uploaded asset after submission error"
                );
            }
        }
    }
}

/// Run `call` with `token`; on a 401 force one refresh and run it again.
async fn with_token_refresh<T, F, Fut>(
    tokens: &dyn TokenProvider,
    token: String,
    call: F,
) -> Result<T, SubmissionError>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<T, SubmissionError>>,
{
    match call(token).await {
        Err(e) if e.is_auth_rejection() => {
            tracing::info!("Content API answered 401, refreshing token");
            let fresh = tokens.get_token(true).await?;
            call(fresh).await
        }
        other => other,
    }
}
