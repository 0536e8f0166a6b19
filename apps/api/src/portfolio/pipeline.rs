//! Portfolio pipeline. Drives one upload from text extraction to publishing.
//!
//! Flow: RECEIVED → EXTRACTING → GENERATING → GENERATED → PUBLISHING → DONE
//!
//! Extraction and generation are fatal stages (`Result<_, AppError>`).
//! Publishing is a soft stage: its failure is attached to an otherwise
//! successful response and never masks the generated page.

use std::fmt;
use std::path::Path;

use chrono::Utc;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::portfolio::{GithubSummary, PortfolioResponse};
use crate::publisher::{Publication, PublishError, DEFAULT_FILE_NAME};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Received,
    Extracting,
    Generating,
    Generated,
    Publishing,
    Done,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Received => "RECEIVED",
            PipelineStage::Extracting => "EXTRACTING",
            PipelineStage::Generating => "GENERATING",
            PipelineStage::Generated => "GENERATED",
            PipelineStage::Publishing => "PUBLISHING",
            PipelineStage::Done => "DONE",
        };
        f.write_str(name)
    }
}

/// Repository names are derived from the request time.
pub fn repository_name() -> String {
    format!("portfolio-{}", Utc::now().timestamp_millis())
}

/// Runs extraction, generation and publishing for a stored upload.
/// Does not delete the upload; the caller owns it.
pub async fn run_pipeline(state: &AppState, upload: &Path) -> Result<PortfolioResponse, AppError> {
    info!(stage = %PipelineStage::Received, "Upload stored at {}", upload.display());

    let resume_text = extract_stage(state, upload).await?;
    let html = generate_stage(state, &resume_text).await?;
    info!(stage = %PipelineStage::Generated, "Generated {} chars of HTML", html.len());

    let repo_name = repository_name();
    let response = match publish_stage(state, &html, &repo_name).await {
        Ok(publication) => {
            let deploy = state.deploy_target.link_for(
                &publication.repository.url,
                &publication.repository.default_branch,
            );
            if deploy.is_none() {
                warn!("No deploy link for repository URL '{}'", publication.repository.url);
            }
            PortfolioResponse::generated(html, Some(GithubSummary::published(&publication)), deploy)
        }
        Err(e) => {
            warn!("Publishing failed, returning generated HTML only: {e}");
            PortfolioResponse::generated(html, Some(GithubSummary::failed(&e)), None)
        }
    };

    info!(stage = %PipelineStage::Done, "Pipeline finished");
    Ok(response)
}

async fn extract_stage(state: &AppState, upload: &Path) -> Result<String, AppError> {
    info!(stage = %PipelineStage::Extracting, "Extracting resume text");
    let timeout = state.settings.ocr_timeout;

    match tokio::time::timeout(timeout, state.extractor.extract_text(upload)).await {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(AppError::Extraction(e.to_string())),
        Err(_) => Err(AppError::Extraction(format!(
            "OCR provider did not respond within {}s",
            timeout.as_secs()
        ))),
    }
}

async fn generate_stage(state: &AppState, resume_text: &str) -> Result<String, AppError> {
    info!(stage = %PipelineStage::Generating, "Generating portfolio HTML");
    state
        .generator
        .generate_site(resume_text)
        .await
        .map_err(|e| AppError::Generation(e.to_string()))
}

/// Never fails the request: every outcome is a `Publication` or a `PublishError`.
pub async fn publish_stage(
    state: &AppState,
    html: &str,
    repo_name: &str,
) -> Result<Publication, PublishError> {
    info!(stage = %PipelineStage::Publishing, "Publishing to repository {repo_name}");
    let timeout = state.settings.publish_timeout;

    tokio::time::timeout(
        timeout,
        state.publisher.publish(html, repo_name, DEFAULT_FILE_NAME),
    )
    .await
    .unwrap_or(Err(PublishError::Timeout(timeout.as_secs())))
}
