use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::portfolio::PortfolioResponse;

/// Request-level error for the portfolio endpoint.
/// Every variant is fatal to the request; publishing problems never end up here.
/// Implements `IntoResponse` so handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("No file uploaded. Send the resume in a multipart field named 'file'.")]
    MissingFile,

    #[error("Uploaded file is empty")]
    EmptyFile,

    #[error("Unsupported file type '{0}'. Please upload a PDF, JPG or PNG file.")]
    UnsupportedFile(String),

    #[error("Invalid upload: {0}")]
    Upload(String),

    #[error("Failed to process PDF: {0}")]
    Extraction(String),

    #[error("{0}")]
    Generation(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::MissingFile => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::EmptyFile | AppError::Upload(_) => StatusCode::BAD_REQUEST,
            AppError::UnsupportedFile(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::Extraction(_) | AppError::Generation(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn label(&self) -> &'static str {
        match self {
            AppError::MissingFile
            | AppError::EmptyFile
            | AppError::UnsupportedFile(_)
            | AppError::Upload(_) => "Invalid upload",
            AppError::Extraction(_) => "Failed to extract text from resume",
            AppError::Generation(_) => "Failed to generate HTML from resume",
            AppError::Internal(_) => "Server error",
        }
    }

    /// Failure body, carrying any HTML produced before the failure.
    pub fn to_body(&self, html: Option<String>) -> PortfolioResponse {
        let message = match self {
            // Internal details stay in the logs.
            AppError::Internal(_) => "An internal server error occurred".to_string(),
            other => other.to_string(),
        };
        PortfolioResponse::failure(self.label(), message, html)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Internal(e) => tracing::error!("Internal error: {e:?}"),
            AppError::Extraction(msg) | AppError::Generation(msg) => {
                tracing::error!("Pipeline error: {msg}")
            }
            other => tracing::warn!("Rejected upload: {other}"),
        }

        (self.status(), Json(self.to_body(None))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_maps_to_500() {
        assert_eq!(AppError::MissingFile.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_unsupported_file_maps_to_415() {
        assert_eq!(
            AppError::UnsupportedFile("notes.txt".into()).status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
    }

    #[test]
    fn test_internal_error_message_is_not_leaked() {
        let body = AppError::Internal(anyhow::anyhow!("disk full at /secret/path")).to_body(None);
        assert_eq!(body.message.as_deref(), Some("An internal server error occurred"));
        assert!(!body.success);
    }

    #[test]
    fn test_failure_body_keeps_partial_html() {
        let body = AppError::Generation("quota".into()).to_body(Some("<html/>".into()));
        assert_eq!(body.html.as_deref(), Some("<html/>"));
        assert_eq!(body.error.as_deref(), Some("Failed to generate HTML from resume"));
    }
}
