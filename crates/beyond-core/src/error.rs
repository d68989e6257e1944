//! Error types module
//!
//! This module provides the error taxonomy of the submission pipeline. Local
//! validation problems are reported as [`FieldErrors`] (per field) or
//! [`AssetValidationError`] (file selection); everything that can go wrong once an
//! attempt starts is a [`SubmissionError`].

use std::collections::BTreeMap;
use std::fmt;

use crate::models::MediaKind;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like a rejected upload
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be presented to the creator.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "SERVER_REJECTED")
    fn error_code(&self) -> &'static str;

    /// Whether resubmitting the same draft may succeed
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the creator
    fn suggested_action(&self) -> Option<&'static str>;

    /// Human-readable message shown in the Failed state
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// Per-field validation messages, ordered by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    /// `Ok(())` when no field failed, otherwise the collected errors.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<validator::ValidationErrors> for FieldErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut out = FieldErrors::new();
        for (field, field_errors) in errors.field_errors() {
            for err in field_errors.iter() {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| err.code.to_string());
                out.add(field.to_string(), message);
            }
        }
        out
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{} {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Rejection of a file at selection time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssetValidationError {
    #[error("Empty file: {name}")]
    EmptyFile { name: String },

    #[error("Invalid content type: {content_type} (expected {expected}*)")]
    WrongKind {
        content_type: String,
        expected: &'static str,
    },

    #[error("Unsupported content type: {content_type} (allowed: {allowed:?})")]
    UnsupportedType {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    TooLarge { kind: MediaKind, size: u64, max: u64 },
}

impl AssetValidationError {
    /// Message suitable for display next to the file picker.
    pub fn client_message(&self) -> String {
        match self {
            AssetValidationError::EmptyFile { .. } => "The selected file is empty".to_string(),
            AssetValidationError::WrongKind { expected, .. } => match *expected {
                "video/" => "Please select a valid video file".to_string(),
                _ => "Please select a valid image file".to_string(),
            },
            AssetValidationError::UnsupportedType { allowed, .. } => {
                format!("Only {} files are allowed", allowed.join(", "))
            }
            AssetValidationError::TooLarge { kind, max, .. } => {
                let label = match kind {
                    MediaKind::Image => "Image",
                    MediaKind::Video => "Video",
                };
                format!("{} size must be less than {}MB", label, max / (1024 * 1024))
            }
        }
    }
}

/// Terminal failure of a submission attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("Authentication unavailable: {0}")]
    AuthUnavailable(String),

    #[error("Asset upload failed: {0}")]
    AssetUploadFailed(String),

    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Server rejected submission with status {status}: {message}")]
    ServerRejected { status: u16, message: String },

    #[error("Unexpected response with status {status}: {message}")]
    UnexpectedResponse { status: u16, message: String },

    #[error("A submission is already in flight for this draft")]
    AttemptInFlight,
}

impl SubmissionError {
    pub fn error_type(&self) -> &'static str {
        match self {
            SubmissionError::Validation(_) => "Validation",
            SubmissionError::AuthUnavailable(_) => "AuthUnavailable",
            SubmissionError::AssetUploadFailed(_) => "AssetUploadFailed",
            SubmissionError::NetworkFailure(_) => "NetworkFailure",
            SubmissionError::ServerRejected { .. } => "ServerRejected",
            SubmissionError::UnexpectedResponse { .. } => "UnexpectedResponse",
            SubmissionError::AttemptInFlight => "AttemptInFlight",
        }
    }

    /// True for a 401 from the content API, the only case that triggers a token refresh.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, SubmissionError::ServerRejected { status: 401, .. })
    }
}

/// Static metadata per variant: (error_code, recoverable, suggested_action, log_level).
fn submission_error_static_metadata(
    err: &SubmissionError,
) -> (&'static str, bool, Option<&'static str>, LogLevel) {
    match err {
        SubmissionError::Validation(_) => (
            "VALIDATION_ERROR",
            false,
            Some("Fill in the highlighted fields and submit again"),
            LogLevel::Debug,
        ),
        SubmissionError::AuthUnavailable(_) => (
            "AUTH_UNAVAILABLE",
            false,
            Some("Sign in again"),
            LogLevel::Warn,
        ),
        SubmissionError::AssetUploadFailed(_) => (
            "ASSET_UPLOAD_FAILED",
            true,
            Some("Retry after a short delay"),
            LogLevel::Warn,
        ),
        SubmissionError::NetworkFailure(_) => (
            "NETWORK_FAILURE",
            true,
            Some("Check your connection and retry"),
            LogLevel::Warn,
        ),
        SubmissionError::ServerRejected { status, .. } if *status >= 500 => (
            "SERVER_REJECTED",
            true,
            Some("Retry after a short delay"),
            LogLevel::Error,
        ),
        SubmissionError::ServerRejected { .. } => (
            "SERVER_REJECTED",
            false,
            Some("Review the submission and try again"),
            LogLevel::Warn,
        ),
        SubmissionError::UnexpectedResponse { .. } => (
            "UNEXPECTED_RESPONSE",
            false,
            Some("Update the client or contact support"),
            LogLevel::Error,
        ),
        SubmissionError::AttemptInFlight => (
            "ATTEMPT_IN_FLIGHT",
            true,
            Some("Wait for the current submission to finish"),
            LogLevel::Debug,
        ),
    }
}

impl ErrorMetadata for SubmissionError {
    fn error_code(&self) -> &'static str {
        submission_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        submission_error_static_metadata(self).1
    }

    fn suggested_action(&self) -> Option<&'static str> {
        submission_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        submission_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            SubmissionError::Validation(fields) => format!("Please fix: {}", fields),
            SubmissionError::AuthUnavailable(_) => {
                "You must be signed in to publish content".to_string()
            }
            SubmissionError::AssetUploadFailed(_) => "Failed to upload image".to_string(),
            SubmissionError::NetworkFailure(_) => {
                "Could not reach the server. Please try again".to_string()
            }
            SubmissionError::ServerRejected { message, .. } => message.clone(),
            SubmissionError::UnexpectedResponse { .. } => {
                "The server sent a response this client does not understand".to_string()
            }
            SubmissionError::AttemptInFlight => "Publishing...".to_string(),
        }
    }
}
