//! Rebuildable multipart bodies whose binary parts stream through a progress counter.
//!
//! A `MultipartBody` is plain data (`Bytes` clones are cheap), so the same request can
//! be turned into a fresh `reqwest::multipart::Form` for a resend after a token refresh.

use bytes::Bytes;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};

use beyond_core::SelectedFile;

use crate::progress::ProgressCounter;

/// Size of the slices binary parts are streamed in.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// A binary part: file name, MIME type and contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl FilePart {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<&SelectedFile> for FilePart {
    fn from(file: &SelectedFile) -> Self {
        FilePart::new(file.name.clone(), file.content_type.clone(), file.data.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Field {
    Text { name: String, value: String },
    File { name: String, part: FilePart },
}

/// Ordered multipart fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartBody {
    fields: Vec<Field>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(Field::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Append one text field per value under the same name.
    pub fn repeated<'a>(mut self, name: &str, values: impl IntoIterator<Item = &'a String>) -> Self {
        for value in values {
            self = self.text(name, value.clone());
        }
        self
    }

    pub fn file(mut self, name: impl Into<String>, part: FilePart) -> Self {
        self.fields.push(Field::File {
            name: name.into(),
            part,
        });
        self
    }

    /// Total bytes across binary parts; the denominator for progress.
    pub fn binary_len(&self) -> u64 {
        self.fields
            .iter()
            .map(|f| match f {
                Field::File { part, .. } => part.len(),
                Field::Text { .. } => 0,
            })
            .sum()
    }

    /// All text values recorded under `name`, in order.
    pub fn text_values(&self, name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter_map(|f| match f {
                Field::Text { name: n, value } if n == name => Some(value.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn file_part(&self, name: &str) -> Option<&FilePart> {
        self.fields.iter().find_map(|f| match f {
            Field::File { name: n, part } if n == name => Some(part),
            _ => None,
        })
    }

    /// Build a form for one send. Binary parts advance `counter` as they are polled.
    pub fn to_form(&self, counter: &ProgressCounter) -> Form {
        self.fields.iter().fold(Form::new(), |form, field| match field {
            Field::Text { name, value } => form.text(name.clone(), value.clone()),
            Field::File { name, part } => form.part(name.clone(), counting_part(part, counter)),
        })
    }
}

fn counting_part(file: &FilePart, counter: &ProgressCounter) -> Part {
    match streamed_part(file, counter).mime_str(&file.content_type) {
        Ok(part) => part,
        Err(e) => {
            tracing::warn!(
                content_type = %file.content_type,
                error = %e,
                "Unparseable MIME type, sending part without one"
            );
            streamed_part(file, counter)
        }
    }
}

fn streamed_part(file: &FilePart, counter: &ProgressCounter) -> Part {
    let data = file.data.clone();
    let len = data.len();
    let chunks: Vec<Bytes> = (0..len)
        .step_by(CHUNK_SIZE)
        .map(|start| data.slice(start..(start + CHUNK_SIZE).min(len)))
        .collect();
    let counter = counter.clone();
    let stream = futures::stream::iter(chunks).map(move |chunk| {
        counter.advance(chunk.len() as u64);
        Ok::<Bytes, std::io::Error>(chunk)
    });
    Part::stream_with_length(reqwest::Body::wrap_stream(stream), len as u64)
        .file_name(file.file_name.clone())
}
