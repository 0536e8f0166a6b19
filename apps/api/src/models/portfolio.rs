use chrono::Utc;
use serde::Serialize;

use crate::deploy::DeployLink;
use crate::publisher::{CommitInfo, Publication, PublishError};

/// Label attached to every publishing failure in the `github` field.
pub const PUBLISH_FAILED: &str = "Failed to upload to GitHub";

/// Body of every `POST /file` response, success or failure.
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioResponse {
    /// True once a page was generated, regardless of publishing.
    pub success: bool,
    pub html: Option<String>,
    pub github: Option<GithubSummary>,
    /// Field name kept for client compatibility; holds any one-click deploy target.
    pub vercel: Option<DeployLink>,
    /// Unix milliseconds.
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum GithubSummary {
    Published {
        repository: String,
        branch: String,
        commit: CommitInfo,
    },
    Failed {
        error: String,
        details: String,
    },
}

impl GithubSummary {
    pub fn published(publication: &Publication) -> Self {
        GithubSummary::Published {
            repository: publication.repository.url.clone(),
            branch: publication.repository.default_branch.clone(),
            commit: publication.commit.clone(),
        }
    }

    pub fn failed(error: &PublishError) -> Self {
        GithubSummary::Failed {
            error: PUBLISH_FAILED.to_string(),
            details: error.to_string(),
        }
    }
}

impl PortfolioResponse {
    /// Generation succeeded; `github`/`vercel` carry whatever publishing produced.
    pub fn generated(
        html: String,
        github: Option<GithubSummary>,
        vercel: Option<DeployLink>,
    ) -> Self {
        Self {
            success: true,
            html: Some(html),
            github,
            vercel,
            timestamp: Utc::now().timestamp_millis(),
            error: None,
            message: None,
        }
    }

    /// The request failed before or during generation.
    pub fn failure(
        error: impl Into<String>,
        message: impl Into<String>,
        html: Option<String>,
    ) -> Self {
        Self {
            success: false,
            html,
            github: None,
            vercel: None,
            timestamp: Utc::now().timestamp_millis(),
            error: Some(error.into()),
            message: Some(message.into()),
        }
    }
}
