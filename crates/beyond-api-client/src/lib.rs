//! HTTP client for the Beyond content API.
//!
//! Every call carries a bearer token supplied by the caller, so token acquisition
//! and refresh stay with the pipeline. Responses are interpreted into
//! `SubmissionError` here: transport failures become `NetworkFailure`, non-2xx
//! answers become `ServerRejected` with the server's `message` or a fixed fallback.

pub mod api;
pub mod multipart;
pub mod progress;

use anyhow::{Context, Result};
use beyond_core::{ClientConfig, SubmissionError};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

pub use api::{
    article_request, channel_picture_request, headline_request, picture_url, video_request,
    ChannelInfo, CreatorProfile, ImageField,
};
pub use multipart::{FilePart, MultipartBody};
pub use progress::{NoProgress, ProgressCounter, ProgressSink};

/// Payload of a 2xx answer. Empty or non-JSON bodies are `null`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Acknowledgment(pub serde_json::Value);

impl Acknowledgment {
    pub fn null() -> Self {
        Acknowledgment(serde_json::Value::Null)
    }

    pub fn value(&self) -> &serde_json::Value {
        &self.0
    }
}

/// Request body, kept as data so a request can be resent.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Value),
    Multipart(MultipartBody),
}

/// A fully composed content API call.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    /// Path below the API prefix, e.g. `/content`.
    pub path: String,
    pub body: RequestBody,
    /// Message used when a rejection carries no readable `message`.
    pub fallback: &'static str,
}

impl OutboundRequest {
    pub fn json(path: impl Into<String>, body: serde_json::Value, fallback: &'static str) -> Self {
        Self {
            path: path.into(),
            body: RequestBody::Json(body),
            fallback,
        }
    }

    pub fn multipart(path: impl Into<String>, body: MultipartBody, fallback: &'static str) -> Self {
        Self {
            path: path.into(),
            body: RequestBody::Multipart(body),
            fallback,
        }
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self.body, RequestBody::Multipart(_))
    }

    pub fn binary_len(&self) -> u64 {
        match &self.body {
            RequestBody::Json(_) => 0,
            RequestBody::Multipart(body) => body.binary_len(),
        }
    }
}

/// HTTP client for the Beyond content API.
#[derive(Clone, Debug)]
pub struct ContentApiClient {
    client: Client,
    base_url: String,
    prefix: String,
}

impl ContentApiClient {
    pub fn new(base_url: &str, prefix: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            prefix: prefix.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(
            &config.api_base_url,
            &config.api_prefix,
            Duration::from_secs(config.http_timeout_secs),
        )
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, self.prefix, path)
    }

    /// Send one request with `token`. Multipart binary parts report to `progress`.
    pub async fn send(
        &self,
        request: &OutboundRequest,
        token: &str,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<Acknowledgment, SubmissionError> {
        let url = self.build_url(&request.path);
        let builder = self.client.post(&url).bearer_auth(token);
        let builder = match &request.body {
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(body) => {
                let counter = ProgressCounter::new(body.binary_len(), progress);
                builder.multipart(body.to_form(&counter))
            }
        };

        tracing::debug!(
            path = %request.path,
            multipart = request.is_multipart(),
            binary_bytes = request.binary_len(),
            "Sending content API request"
        );

        let response = builder.send().await.map_err(network_failure)?;
        interpret(response, request.fallback).await
    }

    /// GET a JSON document.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
        fallback: &'static str,
    ) -> Result<T, SubmissionError> {
        let url = self.build_url(path);
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(network_failure)?;
        let status = response.status().as_u16();
        let ack = interpret(response, fallback).await?;
        serde_json::from_value(ack.0).map_err(|e| {
            tracing::error!(path = %path, status, error = %e, "Unexpected response shape");
            SubmissionError::UnexpectedResponse {
                status,
                message: e.to_string(),
            }
        })
    }
}

fn network_failure(e: reqwest::Error) -> SubmissionError {
    let detail = if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        "could not connect to server".to_string()
    } else {
        e.to_string()
    };
    SubmissionError::NetworkFailure(detail)
}

async fn interpret(
    response: reqwest::Response,
    fallback: &'static str,
) -> Result<Acknowledgment, SubmissionError> {
    let status = response.status();
    let body = response.bytes().await.map_err(network_failure)?;

    if status.is_success() {
        let value = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
        };
        return Ok(Acknowledgment(value));
    }

    let message = rejection_message(&body).unwrap_or_else(|| fallback.to_string());
    tracing::warn!(status = status.as_u16(), message = %message, "Content API rejected request");
    Err(SubmissionError::ServerRejected {
        status: status.as_u16(),
        message,
    })
}

fn rejection_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value
        .get("message")
        .and_then(|m| m.as_str())
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(String::from)
}
