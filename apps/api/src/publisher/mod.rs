//! Repository publishing. Pushes a generated portfolio into a brand-new
//! hosting repository so it can be deployed with one click.
//!
//! Publishing is best-effort: every failure comes back as a classified
//! `PublishError` value, never as a panic or an unhandled error.

pub mod github;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

pub use github::GithubPublisher;

/// File the portfolio is committed as.
pub const DEFAULT_FILE_NAME: &str = "index.html";

const MALFORMED_DEFAULT: &str = "Invalid request. Check repository name and file content.";

// ────────────────────────────────────────────────────────────────────────────
// Result types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitInfo {
    pub sha: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedFile {
    pub name: String,
    pub size: u64,
    pub html_url: String,
    pub raw_url: String,
    pub download_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryInfo {
    /// `owner/name`
    pub name: String,
    pub url: String,
    pub clone_url: String,
    pub ssh_url: String,
    pub default_branch: String,
}

/// Everything known about a successful publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Publication {
    pub commit: CommitInfo,
    pub file: PublishedFile,
    pub repository: RepositoryInfo,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    #[error("Invalid HTML content provided")]
    InvalidContent,

    #[error("Repository name is required")]
    InvalidName,

    #[error("{0}")]
    NotConfigured(&'static str),

    #[error("Repository \"{0}\" already exists. Please choose a different name.")]
    RepositoryExists(String),

    #[error("Authentication failed. Invalid GitHub token.")]
    Unauthenticated,

    #[error("Permission denied. Token may lack required scopes (public_repo or repo).")]
    Forbidden,

    #[error("Resource not found or access denied.")]
    NotFound,

    #[error("{0}")]
    Malformed(String),

    #[error("Publishing timed out after {0}s")]
    Timeout(u64),

    #[error("{0}")]
    Unknown(String),
}

impl PublishError {
    /// Maps a provider status code (if any) and message onto the taxonomy.
    pub fn classify(status: Option<u16>, message: &str) -> Self {
        match status {
            Some(401) => PublishError::Unauthenticated,
            Some(403) => PublishError::Forbidden,
            Some(404) => PublishError::NotFound,
            Some(422) if message.trim().is_empty() => {
                PublishError::Malformed(MALFORMED_DEFAULT.to_string())
            }
            Some(422) => PublishError::Malformed(message.to_string()),
            _ if message.trim().is_empty() => {
                PublishError::Unknown("Unknown error occurred".to_string())
            }
            _ => PublishError::Unknown(message.to_string()),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Settle policy
// ────────────────────────────────────────────────────────────────────────────

/// What to do between creating a repository and writing into it.
/// The hosting provider initialises the default branch asynchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlePolicy {
    None,
    Fixed(Duration),
    PollBranch { interval: Duration, max_polls: u32 },
}

impl Default for SettlePolicy {
    fn default() -> Self {
        SettlePolicy::Fixed(Duration::from_secs(2))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Trait
// ────────────────────────────────────────────────────────────────────────────

/// Creates a repository named `repo_name` containing `html` at `file_name`.
#[async_trait]
pub trait RepositoryPublisher: Send + Sync {
    async fn publish(
        &self,
        html: &str,
        repo_name: &str,
        file_name: &str,
    ) -> Result<Publication, PublishError>;
}
