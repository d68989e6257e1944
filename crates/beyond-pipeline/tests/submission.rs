use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use beyond_api_client::{Acknowledgment, ContentApiClient, NoProgress};
use beyond_core::{
    AssetHandle, AssetLimits, AssetPolicy, AuthError, ContentKind, Draft, DraftBody,
    PreviewRegistry, SelectedFile, StaticTokenProvider, StorageBackend, SubmissionError, TokenProvider,
};
use beyond_pipeline::{
    ImageStrategy, Orchestrator, PercentTracker, SubmissionSession, SubmissionState,
};
use beyond_storage::{LocalStorage, Storage, StorageError, StorageResult, StoredObject};
use bytes::Bytes;
use mockito::Matcher;
use serde_json::json;

fn api(server: &mockito::Server) -> ContentApiClient {
    ContentApiClient::new(&server.url(), "/api", Duration::from_secs(5)).unwrap()
}

fn headline_draft(previews: &PreviewRegistry, message: &str, tags: &[&str]) -> Draft {
    let mut draft = Draft::new(ContentKind::Headline, &AssetLimits::default(), previews);
    let headline = draft.as_headline_mut().unwrap();
    headline.set_message(message);
    for tag in tags {
        headline.tags_mut().add(tag);
    }
    draft
}

fn png(name: &str) -> SelectedFile {
    SelectedFile::new(name, "image/png", b"PNGDATA".to_vec())
}

/// Hands out "stale" until a refresh is forced, then "fresh".
#[derive(Default)]
struct RotatingTokens {
    refreshes: AtomicUsize,
}

#[async_trait]
impl TokenProvider for RotatingTokens {
    async fn get_token(&self, force_refresh: bool) -> Result<String, AuthError> {
        if force_refresh {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
        }
        if self.refreshes.load(Ordering::SeqCst) > 0 {
            Ok("fresh".to_string())
        } else {
            Ok("stale".to_string())
        }
    }
}

/// Never yields a token.
struct HangingTokens;

#[async_trait]
impl TokenProvider for HangingTokens {
    async fn get_token(&self, _force_refresh: bool) -> Result<String, AuthError> {
        std::future::pending().await
    }
}

struct BrokenStore;

#[async_trait]
impl Storage for BrokenStore {
    async fn put_object(&self, _: &str, _: Bytes, _: &str) -> StorageResult<StoredObject> {
        Err(StorageError::UploadFailed("bucket unavailable".to_string()))
    }

    async fn delete(&self, _: &str) -> StorageResult<()> {
        Ok(())
    }

    async fn exists(&self, _: &str) -> StorageResult<bool> {
        Ok(false)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Http
    }
}

async fn local_store(dir: &tempfile::TempDir) -> Arc<LocalStorage> {
    Arc::new(
        LocalStorage::new(dir.path(), "http://assets.test".to_string())
            .await
            .unwrap(),
    )
}

fn stored_files(dir: &tempfile::TempDir) -> usize {
    match std::fs::read_dir(dir.path().join("content-images")) {
        Ok(entries) => entries.count(),
        Err(_) => 0,
    }
}

#[tokio::test]
async fn headline_without_asset_succeeds_and_clears_draft() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/content")
        .match_header("authorization", "Bearer tok")
        .match_body(Matcher::Json(json!({
            "message": "Breaking",
            "isJustIn": true,
            "tags": ["a", "b"],
        })))
        .with_status(201)
        .with_body(r#"{"id":"h1"}"#)
        .expect(1)
        .create_async()
        .await;

    let previews = PreviewRegistry::new();
    let orchestrator = Arc::new(Orchestrator::new(api(&server), ImageStrategy::Inline));
    let mut session =
        SubmissionSession::new(headline_draft(&previews, "Breaking", &["a", "b"]), orchestrator);

    let state = session
        .submit(&StaticTokenProvider::new("tok"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(
        state,
        SubmissionState::Success(Acknowledgment(json!({"id": "h1"})))
    );
    let DraftBody::Headline(headline) = session.draft().body() else {
        panic!("draft kind changed");
    };
    assert_eq!(headline.message(), "");
    assert!(headline.tags().list().is_empty());
    assert!(headline.is_just_in());
    assert!(!session.draft().is_in_flight());
}

#[tokio::test]
async fn successful_submission_releases_previews() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/content")
        .match_body(Matcher::Regex(r#"name="file"; filename="cover.png""#.to_string()))
        .with_status(201)
        .with_body(r#"{"id":"h2"}"#)
        .expect(1)
        .create_async()
        .await;

    let previews = PreviewRegistry::new();
    let mut draft = headline_draft(&previews, "Breaking", &["world"]);
    {
        let headline = draft.as_headline_mut().unwrap();
        headline.set_just_in(false);
        headline.image_mut().select(png("cover.png")).unwrap();
    }
    assert_eq!(previews.live_count(), 1);

    let orchestrator = Arc::new(Orchestrator::new(api(&server), ImageStrategy::Inline));
    let mut session = SubmissionSession::new(draft, orchestrator);
    let state = session
        .submit(&StaticTokenProvider::new("tok"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert!(matches!(state, SubmissionState::Success(_)));
    let DraftBody::Headline(headline) = session.draft().body() else {
        panic!("draft kind changed");
    };
    assert_eq!(headline.message(), "");
    assert!(headline.tags().list().is_empty());
    assert!(headline.is_just_in());
    assert!(!headline.image().is_selected());
    assert_eq!(previews.live_count(), 0);
}

#[tokio::test]
async fn abandoned_attempt_allows_fresh_submit() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/content")
        .match_header("authorization", "Bearer tok")
        .with_status(201)
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;

    let previews = PreviewRegistry::new();
    let orchestrator = Arc::new(Orchestrator::new(api(&server), ImageStrategy::Inline));
    let mut session =
        SubmissionSession::new(headline_draft(&previews, "Breaking", &[]), orchestrator);

    let pending =
        tokio::time::timeout(Duration::from_millis(50), session.submit(&HangingTokens)).await;
    assert!(pending.is_err());
    assert_eq!(session.state(), SubmissionState::Idle);
    assert!(!session.draft().is_in_flight());

    let state = session
        .submit(&StaticTokenProvider::new("tok"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert!(matches!(state, SubmissionState::Success(_)));
}

#[tokio::test]
async fn server_rejection_keeps_draft() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/content")
        .with_status(500)
        .with_body(r#"{"message":"db down"}"#)
        .create_async()
        .await;

    let previews = PreviewRegistry::new();
    let orchestrator = Arc::new(Orchestrator::new(api(&server), ImageStrategy::Inline));
    let mut session =
        SubmissionSession::new(headline_draft(&previews, "Breaking", &["a"]), orchestrator);
    session
        .draft_mut()
        .as_headline_mut()
        .unwrap()
        .image_mut()
        .select(png("cover.png"))
        .unwrap();

    let state = session
        .submit(&StaticTokenProvider::new("tok"))
        .await
        .unwrap();

    assert_eq!(
        state,
        SubmissionState::Failed(SubmissionError::ServerRejected {
            status: 500,
            message: "db down".to_string()
        })
    );
    let DraftBody::Headline(headline) = session.draft().body() else {
        panic!("draft kind changed");
    };
    assert_eq!(headline.message(), "Breaking");
    assert!(headline.tags().contains("a"));
    assert!(headline.image().is_selected());
    assert_eq!(previews.live_count(), 1);
}

#[tokio::test]
async fn invalid_draft_makes_no_request() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let previews = PreviewRegistry::new();
    let orchestrator = Arc::new(Orchestrator::new(api(&server), ImageStrategy::Inline));
    let mut session = SubmissionSession::new(headline_draft(&previews, "   ", &[]), orchestrator);

    let state = session
        .submit(&StaticTokenProvider::new("tok"))
        .await
        .unwrap();

    mock.assert_async().await;
    match state {
        SubmissionState::Failed(SubmissionError::Validation(errors)) => {
            assert!(errors.contains("message"))
        }
        other => panic!("unexpected state {:?}", other),
    }
}

#[tokio::test]
async fn asset_upload_failure_skips_metadata_request() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let previews = PreviewRegistry::new();
    let mut draft = headline_draft(&previews, "Breaking", &[]);
    draft
        .as_headline_mut()
        .unwrap()
        .image_mut()
        .select(png("cover.png"))
        .unwrap();

    let orchestrator = Orchestrator::new(
        api(&server),
        ImageStrategy::PreUpload(Arc::new(BrokenStore)),
    );
    let err = orchestrator
        .submit(&draft, &StaticTokenProvider::new("tok"), Arc::new(NoProgress))
        .await
        .unwrap_err();

    mock.assert_async().await;
    assert!(matches!(
        err,
        SubmissionError::AssetUploadFailed(ref m) if m.contains("bucket unavailable")
    ));
}

#[tokio::test]
async fn pre_uploaded_image_is_referenced_by_url() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/articles")
        .match_body(Matcher::Regex(
            r#""previewImage":"http://assets\.test/content-images/\d+-[0-9a-f]{8}-hero\.png""#
                .to_string(),
        ))
        .with_status(201)
        .with_body("{}")
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let previews = PreviewRegistry::new();
    let mut draft = Draft::new(ContentKind::Article, &AssetLimits::default(), &previews);
    {
        let article = draft.as_article_mut().unwrap();
        article.set_title("Deep dive");
        article.set_preview_content("Teaser");
        article.set_full_content("Body text");
        article.preview_image_mut().select(png("hero.png")).unwrap();
    }

    let orchestrator = Orchestrator::new(
        api(&server),
        ImageStrategy::PreUpload(local_store(&dir).await),
    );
    orchestrator
        .submit(&draft, &StaticTokenProvider::new("tok"), Arc::new(NoProgress))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(stored_files(&dir), 1);
}

#[tokio::test]
async fn failed_submission_removes_pre_uploaded_image() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/content")
        .with_status(503)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let previews = PreviewRegistry::new();
    let mut draft = headline_draft(&previews, "Breaking", &[]);
    draft
        .as_headline_mut()
        .unwrap()
        .image_mut()
        .select(png("cover.png"))
        .unwrap();

    let orchestrator = Orchestrator::new(
        api(&server),
        ImageStrategy::PreUpload(local_store(&dir).await),
    );
    let err = orchestrator
        .submit(&draft, &StaticTokenProvider::new("tok"), Arc::new(NoProgress))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        SubmissionError::ServerRejected {
            status: 503,
            message: "Failed to create content".to_string()
        }
    );
    assert_eq!(stored_files(&dir), 0);
}

#[tokio::test]
async fn unauthorized_triggers_single_refresh() {
    let mut server = mockito::Server::new_async().await;
    let rejected = server
        .mock("POST", "/api/content")
        .match_header("authorization", "Bearer stale")
        .with_status(401)
        .with_body(r#"{"message":"token expired"}"#)
        .expect(1)
        .create_async()
        .await;
    let accepted = server
        .mock("POST", "/api/content")
        .match_header("authorization", "Bearer fresh")
        .with_status(201)
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;

    let previews = PreviewRegistry::new();
    let orchestrator = Arc::new(Orchestrator::new(api(&server), ImageStrategy::Inline));
    let mut session =
        SubmissionSession::new(headline_draft(&previews, "Breaking", &[]), orchestrator);
    let tokens = RotatingTokens::default();

    let state = session.submit(&tokens).await.unwrap();

    rejected.assert_async().await;
    accepted.assert_async().await;
    assert!(matches!(state, SubmissionState::Success(_)));
    assert_eq!(tokens.refreshes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn repeated_unauthorized_is_surfaced() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/content")
        .with_status(401)
        .with_body(r#"{"message":"token expired"}"#)
        .expect(2)
        .create_async()
        .await;

    let previews = PreviewRegistry::new();
    let draft = headline_draft(&previews, "Breaking", &[]);
    let orchestrator = Orchestrator::new(api(&server), ImageStrategy::Inline);
    let tokens = RotatingTokens::default();

    let err = orchestrator
        .submit(&draft, &tokens, Arc::new(NoProgress))
        .await
        .unwrap_err();

    assert!(err.is_auth_rejection());
    assert_eq!(tokens.refreshes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_principal_is_auth_unavailable() {
    let server = mockito::Server::new_async().await;
    let previews = PreviewRegistry::new();
    let draft = headline_draft(&previews, "Breaking", &[]);
    let orchestrator = Orchestrator::new(api(&server), ImageStrategy::Inline);

    let err = orchestrator
        .submit(&draft, &beyond_core::NoTokenProvider, Arc::new(NoProgress))
        .await
        .unwrap_err();
    assert!(matches!(err, SubmissionError::AuthUnavailable(_)));
}

#[tokio::test]
async fn concurrent_attempt_is_rejected() {
    let server = mockito::Server::new_async().await;
    let previews = PreviewRegistry::new();
    let draft = headline_draft(&previews, "Breaking", &[]);
    let orchestrator = Orchestrator::new(api(&server), ImageStrategy::Inline);

    let _held = draft.try_begin_attempt().unwrap();
    let err = orchestrator
        .submit(&draft, &StaticTokenProvider::new("tok"), Arc::new(NoProgress))
        .await
        .unwrap_err();
    assert_eq!(err, SubmissionError::AttemptInFlight);
}

#[tokio::test]
async fn video_progress_is_monotonic_and_bounded() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/videos")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"name="video"; filename="clip.mp4""#.to_string()),
            Matcher::Regex(r#"name="thumbnail"; filename="thumb.png""#.to_string()),
            Matcher::Regex(r#"name="tags""#.to_string()),
        ]))
        .with_status(201)
        .with_body(r#"{"id":"v1"}"#)
        .create_async()
        .await;

    let previews = PreviewRegistry::new();
    let mut draft = Draft::new(ContentKind::Video, &AssetLimits::default(), &previews);
    {
        let video = draft.as_video_mut().unwrap();
        video.set_title("Launch");
        video.tags_mut().extend_csv("space, rockets");
        video
            .video_mut()
            .select(SelectedFile::new("clip.mp4", "video/mp4", vec![b'v'; 512 * 1024]))
            .unwrap();
        video.thumbnail_mut().select(png("thumb.png")).unwrap();
    }

    let seen = Arc::new(Mutex::new(Vec::new()));
    let tracker = {
        let seen = seen.clone();
        PercentTracker::new(move |pct| seen.lock().unwrap().push(pct))
    };
    let orchestrator = Orchestrator::new(api(&server), ImageStrategy::Inline);
    orchestrator
        .submit(&draft, &StaticTokenProvider::new("tok"), Arc::new(tracker))
        .await
        .unwrap();

    mock.assert_async().await;
    let seen = seen.lock().unwrap();
    assert!(!seen.is_empty());
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
    assert!(seen.iter().all(|p| *p <= 100));
    assert_eq!(seen.last().copied(), Some(100));
}

#[tokio::test]
async fn session_publishes_rising_progress_then_success() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/videos")
        .with_status(201)
        .with_body(r#"{"id":"v2"}"#)
        .create_async()
        .await;

    let previews = PreviewRegistry::new();
    let mut draft = Draft::new(ContentKind::Video, &AssetLimits::default(), &previews);
    {
        let video = draft.as_video_mut().unwrap();
        video.set_title("Launch");
        video
            .video_mut()
            .select(SelectedFile::new("clip.mp4", "video/mp4", vec![b'v'; 1024 * 1024]))
            .unwrap();
        video.thumbnail_mut().select(png("thumb.png")).unwrap();
    }

    let orchestrator = Arc::new(Orchestrator::new(api(&server), ImageStrategy::Inline));
    let mut session = SubmissionSession::new(draft, orchestrator);
    let mut updates = session.subscribe();
    let collector = tokio::spawn(async move {
        let mut seen = Vec::new();
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().clone();
            let done = state.is_terminal();
            seen.push(state);
            if done {
                break;
            }
        }
        seen
    });

    let state = session
        .submit(&StaticTokenProvider::new("tok"))
        .await
        .unwrap();
    let seen = collector.await.unwrap();

    assert_eq!(
        state,
        SubmissionState::Success(Acknowledgment(json!({"id": "v2"})))
    );
    assert_eq!(seen.last(), Some(&state));
    let progress: Vec<u8> = seen
        .iter()
        .filter_map(|s| match s {
            SubmissionState::Submitting { progress } => Some(*progress),
            _ => None,
        })
        .collect();
    assert!(!progress.is_empty());
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    assert!(progress.iter().all(|p| *p <= 100));
    let first_submitting = seen
        .iter()
        .position(|s| matches!(s, SubmissionState::Submitting { .. }))
        .unwrap();
    assert!(seen[first_submitting..seen.len() - 1]
        .iter()
        .all(|s| matches!(s, SubmissionState::Submitting { .. })));
}

#[tokio::test]
async fn channel_picture_upload_returns_url() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/creators/upload-channel-picture")
        .match_body(Matcher::Regex(r#"name="channelPicture""#.to_string()))
        .with_status(200)
        .with_body(r#"{"pictureUrl":"https://cdn.test/channel.png"}"#)
        .create_async()
        .await;

    let previews = PreviewRegistry::new();
    let mut picture = AssetHandle::new(
        AssetPolicy::channel_picture(&AssetLimits::default()),
        previews.clone(),
    );
    picture.select(png("channel.png")).unwrap();

    let orchestrator = Orchestrator::new(api(&server), ImageStrategy::Inline);
    let url = orchestrator
        .upload_channel_picture(&picture, &StaticTokenProvider::new("tok"), Arc::new(NoProgress))
        .await
        .unwrap();
    assert_eq!(url, "https://cdn.test/channel.png");
}
