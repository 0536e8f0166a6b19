//! GitHub REST v3 implementation of `RepositoryPublisher`.
//!
//! Flow: GET /user → POST /user/repos → settle → PUT contents → GET contents.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::TempPath;
use tracing::{debug, info, warn};

use crate::config::{configured_owner, configured_token};
use crate::publisher::{
    CommitInfo, Publication, PublishError, PublishedFile, RepositoryInfo, RepositoryPublisher,
    SettlePolicy,
};

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";
const CLIENT_USER_AGENT: &str = concat!("folio-api/", env!("CARGO_PKG_VERSION"));

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct AuthUser {
    login: String,
    name: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateRepoRequest<'a> {
    name: &'a str,
    description: String,
    homepage: String,
    private: bool,
    has_issues: bool,
    has_projects: bool,
    has_wiki: bool,
    auto_init: bool,
}

#[derive(Debug, Deserialize)]
struct RepoOwner {
    login: String,
}

#[derive(Debug, Deserialize)]
struct CreatedRepo {
    full_name: String,
    html_url: String,
    clone_url: String,
    ssh_url: String,
    default_branch: String,
    owner: RepoOwner,
}

#[derive(Debug, Serialize)]
struct Signature<'a> {
    name: &'a str,
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct PutContentRequest<'a> {
    message: String,
    content: String,
    committer: Signature<'a>,
    author: Signature<'a>,
}

#[derive(Debug, Deserialize)]
struct PutContentResponse {
    content: ContentRef,
    commit: CommitRef,
}

#[derive(Debug, Deserialize)]
struct ContentRef {
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct CommitRef {
    sha: String,
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct ContentMetadata {
    size: u64,
    download_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubErrorBody {
    message: String,
    #[serde(default)]
    errors: Vec<Value>,
}

/// A failed provider call before classification.
#[derive(Debug)]
struct ApiFailure {
    status: Option<u16>,
    message: String,
}

impl ApiFailure {
    fn classify(&self) -> PublishError {
        PublishError::classify(self.status, &self.message)
    }
}

impl From<reqwest::Error> for ApiFailure {
    fn from(e: reqwest::Error) -> Self {
        ApiFailure {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

/// Flattens `{"message": ..., "errors": [{"message": ...}]}` into one string.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<GithubErrorBody>(body) {
        Ok(parsed) => {
            let details: Vec<String> = parsed
                .errors
                .iter()
                .filter_map(|e| match e {
                    Value::String(s) => Some(s.clone()),
                    other => other.get("message").and_then(Value::as_str).map(String::from),
                })
                .collect();
            if details.is_empty() {
                parsed.message
            } else {
                format!("{}: {}", parsed.message, details.join("; "))
            }
        }
        Err(_) => body.to_string(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Publisher
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct GithubPublisher {
    client: Client,
    api_url: String,
    token: Option<String>,
    owner: Option<String>,
    settle: SettlePolicy,
    scratch_dir: PathBuf,
}

impl GithubPublisher {
    /// `token`/`owner` may be missing or placeholders; `publish` then reports
    /// `NotConfigured` without touching the network.
    pub fn new(
        api_url: String,
        token: Option<String>,
        owner: Option<String>,
        settle: SettlePolicy,
        scratch_dir: PathBuf,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            api_url: api_url.trim_end_matches('/').to_string(),
            token: configured_token(token),
            owner: configured_owner(owner),
            settle,
            scratch_dir,
        }
    }

    fn authed(&self, builder: RequestBuilder, token: &str) -> RequestBuilder {
        builder
            .bearer_auth(token)
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .header(ACCEPT, GITHUB_ACCEPT)
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiFailure> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiFailure {
                status: Some(status.as_u16()),
                message: error_message(&body),
            });
        }
        Ok(response.json().await?)
    }

    async fn create_repo(
        &self,
        token: &str,
        owner: &str,
        repo_name: &str,
    ) -> Result<CreatedRepo, PublishError> {
        let body = CreateRepoRequest {
            name: repo_name,
            description: format!("Portfolio website generated on {}", Utc::now().to_rfc3339()),
            homepage: format!("https://{owner}.github.io/{repo_name}"),
            private: false,
            has_issues: false,
            has_projects: false,
            has_wiki: false,
            auto_init: true, // creates the default branch
        };

        let request = self.authed(self.client.post(format!("{}/user/repos", self.api_url)), token);
        self.send(request.json(&body)).await.map_err(|failure| {
            if failure.status == Some(422) && failure.message.contains("already exists") {
                PublishError::RepositoryExists(repo_name.to_string())
            } else {
                failure.classify()
            }
        })
    }

    /// Waits for the default branch of a fresh repository to become writable.
    async fn settle(&self, token: &str, owner: &str, repo_name: &str, branch: &str) {
        match self.settle {
            SettlePolicy::None => {}
            SettlePolicy::Fixed(delay) => {
                debug!("Waiting {}ms for repository initialization", delay.as_millis());
                tokio::time::sleep(delay).await;
            }
            SettlePolicy::PollBranch {
                interval,
                max_polls,
            } => {
                let url = format!(
                    "{}/repos/{owner}/{repo_name}/branches/{branch}",
                    self.api_url
                );
                for poll in 0..max_polls {
                    let response = self.authed(self.client.get(&url), token).send().await;
                    if matches!(&response, Ok(r) if r.status() == StatusCode::OK) {
                        debug!("Branch '{branch}' ready after {} polls", poll + 1);
                        return;
                    }
                    tokio::time::sleep(interval).await;
                }
                warn!(
                    "Branch '{branch}' of {owner}/{repo_name} not visible after {max_polls} polls; \
                     writing anyway"
                );
            }
        }
    }

    /// Writes `html` under the scratch directory. The copy is deleted when the
    /// returned guard is dropped, so an abandoned publish leaves nothing behind.
    async fn write_local_copy(
        &self,
        file_name: &str,
        html: &str,
    ) -> Result<TempPath, PublishError> {
        let io_err =
            |e: std::io::Error| PublishError::Unknown(format!("Failed to write local copy: {e}"));
        tokio::fs::create_dir_all(&self.scratch_dir).await.map_err(io_err)?;
        let copy = TempPath::from_path(self.scratch_dir.join(file_name));
        tokio::fs::write(&copy, html).await.map_err(io_err)?;
        Ok(copy)
    }
}

#[async_trait]
impl RepositoryPublisher for GithubPublisher {
    async fn publish(
        &self,
        html: &str,
        repo_name: &str,
        file_name: &str,
    ) -> Result<Publication, PublishError> {
        if html.trim().is_empty() {
            return Err(PublishError::InvalidContent);
        }
        let token = self.token.as_deref().ok_or(PublishError::NotConfigured(
            "GitHub token not configured. Please set the GITHUB_TOKEN variable.",
        ))?;
        let configured_owner = self.owner.as_deref().ok_or(PublishError::NotConfigured(
            "GitHub owner not configured. Please set the GITHUB_OWNER variable.",
        ))?;
        if repo_name.trim().is_empty() {
            return Err(PublishError::InvalidName);
        }

        // 1. Identity
        let user: AuthUser = self
            .send(self.authed(self.client.get(format!("{}/user", self.api_url)), token))
            .await
            .map_err(|f| f.classify())?;
        info!("Authenticated with GitHub as {}", user.login);

        // 2. Repository
        let repo = self.create_repo(token, configured_owner, repo_name).await?;
        info!("Repository created: {}", repo.full_name);
        let owner = repo.owner.login.as_str();
        if owner != configured_owner {
            warn!("Repository owner '{owner}' differs from configured owner '{configured_owner}'");
        }

        // 3. Settle
        self.settle(token, owner, repo_name, &repo.default_branch).await;

        // 4. Commit
        let local_copy = self
            .write_local_copy(&format!("{repo_name}-{file_name}"), html)
            .await?;

        let author_name = user.name.as_deref().unwrap_or(&user.login);
        let fallback_email = format!("{}@users.noreply.github.com", user.login);
        let author_email = user.email.as_deref().unwrap_or(&fallback_email);
        let now = Utc::now();
        let put = PutContentRequest {
            message: format!("Add {file_name} - {}", now.to_rfc3339()),
            content: STANDARD.encode(html.as_bytes()),
            committer: Signature {
                name: author_name,
                email: author_email,
            },
            author: Signature {
                name: author_name,
                email: author_email,
            },
        };
        let contents_url = format!(
            "{}/repos/{owner}/{repo_name}/contents/{file_name}",
            self.api_url
        );
        let committed: Result<PutContentResponse, PublishError> = self
            .send(self.authed(self.client.put(&contents_url), token).json(&put))
            .await
            .map_err(|f| f.classify());

        // 5. Verify
        let verified: Result<ContentMetadata, PublishError> = match committed {
            Ok(_) => self
                .send(self.authed(self.client.get(&contents_url), token))
                .await
                .map_err(|f| f.classify()),
            Err(ref e) => Err(e.clone()),
        };

        // 6. Local cleanup, regardless of outcome
        let local_path = local_copy.to_path_buf();
        if let Err(e) = local_copy.close() {
            warn!("Could not delete local copy {}: {e}", local_path.display());
        }

        let committed = committed?;
        let verified = verified?;
        info!("Uploaded {file_name} to {} ({})", repo.full_name, committed.commit.sha);

        Ok(Publication {
            commit: CommitInfo {
                sha: committed.commit.sha,
                url: committed.commit.html_url,
            },
            file: PublishedFile {
                name: file_name.to_string(),
                size: verified.size,
                html_url: committed.content.html_url,
                raw_url: format!(
                    "https://raw.githubusercontent.com/{owner}/{repo_name}/{}/{file_name}",
                    repo.default_branch
                ),
                download_url: verified.download_url,
            },
            repository: RepositoryInfo {
                name: repo.full_name.clone(),
                url: repo.html_url.clone(),
                clone_url: repo.clone_url.clone(),
                ssh_url: repo.ssh_url.clone(),
                default_branch: repo.default_branch.clone(),
            },
            timestamp: now,
        })
    }
}
