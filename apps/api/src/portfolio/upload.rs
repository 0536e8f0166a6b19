//! Receiving the resume upload and owning its temporary file.

use std::path::Path;

use anyhow::Context;
use axum::extract::Multipart;
use chrono::Utc;
use tempfile::TempPath;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::ocr_client::DocumentKind;

const FILE_FIELD: &str = "file";
const MAX_NAME_LEN: usize = 100;

/// A resume stored on local disk for the lifetime of one request.
/// The file is removed when this value is dropped, including when the
/// request future is cancelled.
#[derive(Debug)]
pub struct UploadedDocument {
    pub original_name: String,
    pub content_type: Option<String>,
    pub kind: DocumentKind,
    pub size: usize,
    file: TempPath,
}

impl UploadedDocument {
    pub fn path(&self) -> &Path {
        &self.file
    }

    /// Deletes the temporary file now and logs the outcome.
    pub fn discard(self) {
        let path = self.file.to_path_buf();
        match self.file.close() {
            Ok(()) => debug!("Removed upload {}", path.display()),
            Err(e) => warn!("Could not delete upload {}: {e}", path.display()),
        }
    }
}

/// Reduces a client-supplied name to a safe single path component.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        return "upload".to_string();
    }
    // Keep the tail so the extension survives truncation.
    let skip = cleaned.chars().count().saturating_sub(MAX_NAME_LEN);
    cleaned.chars().skip(skip).collect()
}

/// Sanitized name that always ends in the extension of `kind`.
pub fn stored_name(original_name: &str, kind: DocumentKind) -> String {
    let name = sanitize_filename(original_name);
    if DocumentKind::detect(&name, None) == Some(kind) {
        name
    } else {
        format!("{name}.{}", kind.extension())
    }
}

/// Reads the `file` field of a multipart body and stores it under `dir`
/// with a unique, timestamp-derived name.
pub async fn receive_upload(
    mut multipart: Multipart,
    dir: &Path,
) -> Result<UploadedDocument, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Upload(format!("Failed to read multipart: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let original_name = field.file_name().unwrap_or("resume").to_string();
        let content_type = field.content_type().map(str::to_string);
        let Some(kind) = DocumentKind::detect(&original_name, content_type.as_deref()) else {
            return Err(AppError::UnsupportedFile(original_name));
        };

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Upload(format!("Failed to read file data: {e}")))?;
        if data.is_empty() {
            return Err(AppError::EmptyFile);
        }

        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create upload directory {}", dir.display()))?;
        let file = TempPath::from_path(dir.join(format!(
            "{}-{}-{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple(),
            stored_name(&original_name, kind)
        )));
        tokio::fs::write(&file, &data)
            .await
            .with_context(|| format!("Failed to store upload at {}", file.display()))?;

        debug!(
            "Stored upload '{}' ({} bytes) at {}",
            original_name,
            data.len(),
            file.display()
        );
        return Ok(UploadedDocument {
            original_name,
            content_type,
            kind,
            size: data.len(),
            file,
        });
    }

    Err(AppError::MissingFile)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_supported(file_name: &str, content_type: Option<&str>) -> bool {
        DocumentKind::detect(file_name, content_type).is_some()
    }

    #[test]
    fn test_supported_by_extension_or_mime() {
        assert!(is_supported("Resume.PDF", None));
        assert!(is_supported("scan.jpeg", Some("application/octet-stream")));
        assert!(is_supported("blob", Some("image/png")));
        assert!(is_supported("blob", Some("application/pdf; charset=binary")));
    }

    #[test]
    fn test_unsupported_when_neither_matches() {
        assert!(!is_supported("notes.txt", Some("text/plain")));
        assert!(!is_supported("resume.docx", None));
        assert!(!is_supported("pdf", None));
    }

    #[test]
    fn test_sanitize_strips_directories_and_odd_chars() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\My CV (1).pdf"), "My_CV__1_.pdf");
        assert_eq!(sanitize_filename(".hidden.png"), "hidden.png");
        assert_eq!(sanitize_filename(""), "upload");
    }

    #[test]
    fn test_sanitize_truncates_but_keeps_extension() {
        let long = format!("{}.pdf", "a".repeat(300));
        let cleaned = sanitize_filename(&long);
        assert_eq!(cleaned.len(), MAX_NAME_LEN);
        assert!(cleaned.ends_with(".pdf"));
    }

    #[test]
    fn test_detect_prefers_extension_over_content_type() {
        assert_eq!(
            DocumentKind::detect("scan.PNG", Some("application/pdf")),
            Some(DocumentKind::Png)
        );
        assert_eq!(DocumentKind::detect("blob", Some("image/jpg")), Some(DocumentKind::Jpeg));
        assert_eq!(DocumentKind::detect("blob", None), None);
    }

    #[test]
    fn test_stored_name_gets_extension_from_content_type() {
        assert_eq!(stored_name("blob", DocumentKind::Png), "blob.png");
        assert_eq!(stored_name("cv.txt", DocumentKind::Pdf), "cv.txt.pdf");
        assert_eq!(stored_name("Scan.JPEG", DocumentKind::Jpeg), "Scan.JPEG");
    }

    fn stored_document(dir: &Path) -> UploadedDocument {
        let path = dir.join("resume.pdf");
        std::fs::write(&path, b"%PDF").unwrap();
        UploadedDocument {
            original_name: "resume.pdf".into(),
            content_type: Some("application/pdf".into()),
            kind: DocumentKind::Pdf,
            size: 4,
            file: TempPath::from_path(path),
        }
    }

    #[test]
    fn test_discard_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let doc = stored_document(dir.path());
        let path = doc.path().to_path_buf();

        doc.discard();
        assert!(!path.exists());
    }

    #[test]
    fn test_dropping_document_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let doc = stored_document(dir.path());
        let path = doc.path().to_path_buf();
        assert!(path.exists());

        drop(doc);
        assert!(!path.exists());
    }
}
