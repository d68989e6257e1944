//! Beyond CLI: compose and publish content from the command line.
//!
//! Configuration comes from the environment (see `ClientConfig::from_env`); the bearer
//! token from BEYOND_TOKEN_FILE, BEYOND_API_TOKEN or JWT_TOKEN.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use beyond_cli::{
    article_draft, error_json, headline_draft, init_tracing, outcome_json, render_state,
    select_file, video_draft,
};
use beyond_core::{
    provider_from_config, AssetHandle, AssetPolicy, ClientConfig, Draft, ErrorMetadata, LogLevel,
    PreviewRegistry, TokenProvider,
};
use beyond_pipeline::{Orchestrator, PercentTracker, SubmissionSession, SubmissionState};
use clap::{Parser, Subcommand};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "beyond", about = "Publish headlines, articles and videos to Beyond")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish a short headline
    Headline {
        /// Headline text (at most 180 characters)
        #[arg(long)]
        message: String,
        /// Optional image to attach
        #[arg(long)]
        image: Option<PathBuf>,
        /// Mark the headline as "just in"
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        just_in: bool,
        /// Tags; repeat the flag or pass a comma-separated list
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Publish an article
    Article {
        #[arg(long)]
        title: String,
        /// Teaser shown in listings
        #[arg(long)]
        preview: String,
        /// Full article text
        #[arg(long, conflicts_with = "content_file")]
        content: Option<String>,
        /// Read the full article text from a file
        #[arg(long)]
        content_file: Option<PathBuf>,
        /// Optional preview image
        #[arg(long)]
        image: Option<PathBuf>,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Upload a video with its thumbnail
    Video {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// Video file
        #[arg(long)]
        video: PathBuf,
        /// Thumbnail image
        #[arg(long)]
        thumbnail: PathBuf,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Replace the channel picture
    ChannelPicture {
        /// JPEG, PNG or GIF image
        file: PathBuf,
    },
    /// Show the signed-in creator's profile
    Verify,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

/// Run a draft through a session, echoing state changes to stderr.
async fn publish(
    draft: Draft,
    orchestrator: Arc<Orchestrator>,
    tokens: &dyn TokenProvider,
) -> anyhow::Result<bool> {
    let mut session = SubmissionSession::new(draft, orchestrator);
    let mut updates = session.subscribe();
    let printer = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let line = render_state(&updates.borrow_and_update());
            eprintln!("{}", line);
        }
    });

    let state = session.submit(tokens).await?;
    drop(session);
    printer.await.ok();

    if let SubmissionState::Failed(error) = &state {
        let code = error.error_code();
        match error.log_level() {
            LogLevel::Debug => {
                tracing::debug!(error_code = code, error = %error, "Submission failed")
            }
            LogLevel::Warn => {
                tracing::warn!(error_code = code, error = %error, "Submission failed")
            }
            LogLevel::Error => {
                tracing::error!(error_code = code, error = %error, "Submission failed")
            }
        }
    }

    print_json(&outcome_json(&state))?;
    Ok(matches!(state, SubmissionState::Success(_)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = ClientConfig::from_env().context("Invalid configuration")?;
    let tokens = provider_from_config(&config);
    let orchestrator = Arc::new(
        Orchestrator::from_config(&config)
            .await
            .context("Failed to create submission pipeline")?,
    );
    let previews = PreviewRegistry::new();
    let limits = config.limits;

    let ok = match cli.command {
        Commands::Headline {
            message,
            image,
            just_in,
            tags,
        } => {
            let draft =
                headline_draft(&limits, &previews, &message, image.as_deref(), just_in, &tags)
                    .await?;
            publish(draft, orchestrator, tokens.as_ref()).await?
        }
        Commands::Article {
            title,
            preview,
            content,
            content_file,
            image,
            tags,
        } => {
            let full_content = match (content, content_file) {
                (Some(text), _) => text,
                (None, Some(path)) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                (None, None) => anyhow::bail!("Provide --content or --content-file"),
            };
            let draft = article_draft(
                &limits,
                &previews,
                &title,
                &preview,
                &full_content,
                image.as_deref(),
                &tags,
            )
            .await?;
            publish(draft, orchestrator, tokens.as_ref()).await?
        }
        Commands::Video {
            title,
            description,
            video,
            thumbnail,
            tags,
        } => {
            let draft = video_draft(
                &limits,
                &previews,
                &title,
                description.as_deref(),
                &video,
                &thumbnail,
                &tags,
            )
            .await?;
            publish(draft, orchestrator, tokens.as_ref()).await?
        }
        Commands::ChannelPicture { file } => {
            let mut picture =
                AssetHandle::new(AssetPolicy::channel_picture(&limits), previews.clone());
            select_file(&mut picture, &file).await?;
            let tracker = PercentTracker::new(|pct| eprintln!("Uploading... {}%", pct));
            match orchestrator
                .upload_channel_picture(&picture, tokens.as_ref(), Arc::new(tracker))
                .await
            {
                Ok(url) => {
                    print_json(&serde_json::json!({ "status": "success", "pictureUrl": url }))?;
                    true
                }
                Err(error) => {
                    print_json(&error_json(&error))?;
                    false
                }
            }
        }
        Commands::Verify => match orchestrator.verify_creator(tokens.as_ref()).await {
            Ok(profile) => {
                print_json(&profile)?;
                true
            }
            Err(error) => {
                print_json(&error_json(&error))?;
                false
            }
        },
    };

    tracing::debug!(live_previews = previews.live_count(), "Exiting");
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
