/// LLM Client: the single point of entry for all Gemini API calls.
///
/// ARCHITECTURAL RULE: No other module may call the generation provider directly.
/// Rate-limit retries live here and nowhere else.
use std::future::Future;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

use prompts::build_portfolio_prompt;

/// Model used when `GEMINI_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
const RATE_LIMIT_STATUS: u16 = 429;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(1000);
/// Upper bound on a provider-supplied retry hint.
pub const MAX_RETRY_HINT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error(
        "Gemini API quota exceeded after {attempts} attempts. Please wait and try again later, \
         or upgrade your plan at https://ai.google.dev/pricing. Original error: {message}"
    )]
    QuotaExhausted { attempts: u32, message: String },
}

impl LlmError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, LlmError::Api { status, .. } if *status == RATE_LIMIT_STATUS)
    }

    /// The provider's own message, without our wrapping.
    fn provider_message(&self) -> String {
        match self {
            LlmError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Retry policy
// ────────────────────────────────────────────────────────────────────────────

/// Backoff policy for rate-limited generation calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_INITIAL_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff: `initial_delay * 2^attempt` (attempt is 0-indexed).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial_delay.saturating_mul(factor)
    }

    /// Delay before retrying after `attempt` failed with `message`.
    /// An explicit "retry in Ns" hint from the provider always wins.
    pub fn delay_for(&self, attempt: u32, message: &str) -> Duration {
        parse_retry_hint(message).unwrap_or_else(|| self.backoff(attempt))
    }
}

/// Extracts a `retry in 2.5s` style hint, rounded up to whole milliseconds
/// and capped at `MAX_RETRY_HINT`.
pub fn parse_retry_hint(message: &str) -> Option<Duration> {
    static RETRY_HINT: OnceLock<Regex> = OnceLock::new();
    let re = RETRY_HINT.get_or_init(|| {
        Regex::new(r"(?i)retry in ([\d.]+)\s*s").expect("retry hint pattern is valid")
    });

    let seconds: f64 = re.captures(message)?.get(1)?.as_str().parse().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    let hinted = Duration::from_millis((seconds * 1000.0).ceil() as u64);
    Some(hinted.min(MAX_RETRY_HINT))
}

/// Runs `call` until it succeeds, fails with a non-rate-limit error, or the
/// policy's attempts are used up. `call` receives the 0-indexed attempt number.
pub async fn retry_on_rate_limit<T, F, Fut>(
    policy: &RetryPolicy,
    mut call: F,
) -> Result<T, LlmError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        let err = match call(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_rate_limited() => e,
            Err(e) => return Err(e),
        };

        let message = err.provider_message();
        if attempt + 1 >= attempts {
            return Err(LlmError::QuotaExhausted { attempts, message });
        }

        let delay = policy.delay_for(attempt, &message);
        warn!(
            "Quota exceeded. Retrying in {}ms (attempt {}/{})",
            delay.as_millis(),
            attempt + 1,
            attempts
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, if any.
    fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// Turns extracted resume text into a single-file portfolio page.
#[async_trait]
pub trait SiteGenerator: Send + Sync {
    async fn generate_site(&self, resume_text: &str) -> Result<String, LlmError>;
}

/// Gemini `generateContent` client with rate-limit retry.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    retry: RetryPolicy,
}

impl LlmClient {
    pub fn new(api_key: String, base_url: String, model: String, retry: RetryPolicy) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            retry,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Makes a single call to the generation endpoint. No retries.
    pub async fn call(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let request_body = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            warn!("Gemini API returned {}: {}", status, message);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let parsed: GenerateContentResponse = serde_json::from_str(&body)?;
        let text = parsed.text().ok_or(LlmError::EmptyContent)?;

        debug!("Gemini call succeeded: {} chars generated", text.len());
        Ok(text)
    }
}

#[async_trait]
impl SiteGenerator for LlmClient {
    async fn generate_site(&self, resume_text: &str) -> Result<String, LlmError> {
        let prompt = build_portfolio_prompt(resume_text);
        let prompt = prompt.as_str();
        retry_on_rate_limit(&self.retry, move |_| self.call(prompt)).await
    }
}
