//! OCR client. Turns an uploaded resume (PDF or image) into plain text.
//!
//! Talks to the OCR.space `parse/image` endpoint. The call is never retried:
//! any failure surfaces as a single `OcrError` carrying the provider message.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Failed to read upload: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OCR API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("OCR processing failed: {0}")]
    Processing(String),

    #[error("OCR response contained no parsed text")]
    NoResults,
}

/// Document formats the extraction provider accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Jpeg,
    Png,
}

impl DocumentKind {
    fn from_extension(file_name: &str) -> Option<Self> {
        let (_, ext) = file_name.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "jpg" | "jpeg" => Some(DocumentKind::Jpeg),
            "png" => Some(DocumentKind::Png),
            _ => None,
        }
    }

    fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type.split(';').next().unwrap_or("").trim();
        match essence.to_ascii_lowercase().as_str() {
            "application/pdf" => Some(DocumentKind::Pdf),
            "image/jpeg" | "image/jpg" => Some(DocumentKind::Jpeg),
            "image/png" => Some(DocumentKind::Png),
            _ => None,
        }
    }

    /// Extension wins; the declared content type is the fallback.
    pub fn detect(file_name: &str, content_type: Option<&str>) -> Option<Self> {
        Self::from_extension(file_name).or_else(|| content_type.and_then(Self::from_content_type))
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.file_name()?.to_str().and_then(Self::from_extension)
    }

    pub fn extension(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Jpeg => "jpg",
            DocumentKind::Png => "png",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "application/pdf",
            DocumentKind::Jpeg => "image/jpeg",
            DocumentKind::Png => "image/png",
        }
    }

    /// Value of the provider's `filetype` form field.
    fn provider_file_type(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "PDF",
            DocumentKind::Jpeg => "JPG",
            DocumentKind::Png => "PNG",
        }
    }
}

/// Extracts best-effort plain text from a locally stored document.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, path: &Path) -> Result<String, OcrError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OcrResponse {
    #[serde(default)]
    parsed_results: Vec<ParsedResult>,
    #[serde(default)]
    is_errored_on_processing: bool,
    /// A string or a list of strings, depending on the failure.
    #[serde(default)]
    error_message: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParsedResult {
    #[serde(default)]
    parsed_text: String,
}

impl OcrResponse {
    fn error_text(&self) -> String {
        match &self.error_message {
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("; "),
            _ => "unknown OCR error".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct OcrClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OcrClient {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl TextExtractor for OcrClient {
    async fn extract_text(&self, path: &Path) -> Result<String, OcrError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("resume.pdf")
            .to_string();

        let mut form = multipart::Form::new().text("apikey", self.api_key.clone());
        let mut part = multipart::Part::bytes(bytes).file_name(file_name);
        if let Some(kind) = DocumentKind::from_path(path) {
            part = part.mime_str(kind.mime_type())?;
            form = form.text("filetype", kind.provider_file_type());
        }
        let form = form.part("file", part);

        let response = self
            .client
            .post(format!("{}/parse/image", self.base_url))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(OcrError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let parsed: OcrResponse = response.json().await?;
        if parsed.is_errored_on_processing {
            return Err(OcrError::Processing(parsed.error_text()));
        }

        let text = parsed
            .parsed_results
            .into_iter()
            .next()
            .map(|r| r.parsed_text)
            .ok_or(OcrError::NoResults)?;

        debug!("OCR extracted {} chars from {}", text.len(), path.display());
        Ok(text)
    }
}
