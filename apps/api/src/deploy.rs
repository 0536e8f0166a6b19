//! One-click deploy links for a freshly published repository.
//!
//! Pure functions only. The target platform is a URL template with a single
//! `{repo}` placeholder that receives the percent-encoded repository reference.

use reqwest::Url;
use serde::Serialize;

/// Vercel "clone and deploy" intent. Default target.
pub const VERCEL_CLONE_TEMPLATE: &str = "https://vercel.com/new/clone?repository-url={repo}";

const DEPLOY_INSTRUCTIONS: &str = "Click the URL to deploy the portfolio instantly";

/// A static-hosting platform that accepts a repository URL as a deploy intent.
#[derive(Debug, Clone)]
pub struct DeployTarget {
    template: String,
}

impl Default for DeployTarget {
    fn default() -> Self {
        Self::new(VERCEL_CLONE_TEMPLATE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployLink {
    pub deploy_url: String,
    pub instructions: String,
}

impl DeployTarget {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Builds the deploy link for `repo_url` at `branch`.
    /// Returns `None` for an empty or non-http(s) repository URL.
    pub fn link_for(&self, repo_url: &str, branch: &str) -> Option<DeployLink> {
        let repo_url = repo_url.trim().trim_end_matches('/');
        let parsed = Url::parse(repo_url).ok()?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return None;
        }

        let branch = branch.trim();
        let reference = if branch.is_empty() {
            repo_url.to_string()
        } else {
            format!("{repo_url}/tree/{branch}")
        };

        let encoded = urlencoding::encode(&reference);
        let deploy_url = if self.template.contains("{repo}") {
            self.template.replace("{repo}", &encoded)
        } else {
            format!("{}{}", self.template, encoded)
        };

        Some(DeployLink {
            deploy_url,
            instructions: DEPLOY_INSTRUCTIONS.to_string(),
        })
    }
}
