use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

/// Placeholder values shipped in sample `.env` files. Treated the same as unset.
const TOKEN_PLACEHOLDER: &str = "your_github_personal_access_token_here";
const OWNER_PLACEHOLDER: &str = "your_github_username";

/// Application configuration loaded from environment variables.
/// Fails at startup if the OCR or generation API keys are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub ocr_api_key: String,
    pub ocr_base_url: String,
    pub ocr_timeout: Duration,
    pub gemini_api_key: String,
    pub gemini_base_url: String,
    pub gemini_model: String,
    pub generation_max_attempts: u32,
    pub generation_initial_delay: Duration,
    /// Hosting credentials are optional: publishing degrades to a per-request error.
    pub github_token: Option<String>,
    pub github_owner: Option<String>,
    pub github_api_url: String,
    pub publish_timeout: Duration,
    pub repo_settle: Duration,
    /// When non-zero, poll for the default branch instead of sleeping once.
    pub repo_settle_polls: u32,
    pub deploy_url_template: String,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            ocr_api_key: require_env("OCR_API_KEY")?,
            ocr_base_url: env_or("OCR_BASE_URL", "https://api.ocr.space"),
            ocr_timeout: Duration::from_secs(parse_env("OCR_TIMEOUT_SECS", 60)?),
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            gemini_base_url: env_or(
                "GEMINI_BASE_URL",
                "https://generativelanguage.googleapis.com",
            ),
            gemini_model: env_or("GEMINI_MODEL", crate::llm_client::DEFAULT_MODEL),
            generation_max_attempts: parse_env("GENERATION_MAX_ATTEMPTS", 3)?,
            generation_initial_delay: Duration::from_millis(parse_env(
                "GENERATION_INITIAL_DELAY_MS",
                1000,
            )?),
            github_token: configured_token(std::env::var("GITHUB_TOKEN").ok()),
            github_owner: configured_owner(std::env::var("GITHUB_OWNER").ok()),
            github_api_url: env_or("GITHUB_API_URL", "https://api.github.com"),
            publish_timeout: Duration::from_secs(parse_env("PUBLISH_TIMEOUT_SECS", 60)?),
            repo_settle: Duration::from_millis(parse_env("REPO_SETTLE_MS", 2000)?),
            repo_settle_polls: parse_env("REPO_SETTLE_POLLS", 0)?,
            deploy_url_template: env_or(
                "DEPLOY_URL_TEMPLATE",
                crate::deploy::VERCEL_CLONE_TEMPLATE,
            ),
            upload_dir: PathBuf::from(env_or("UPLOAD_DIR", "uploads")),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            port: parse_env("PORT", 3000)?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }

    /// True when both hosting credentials are present and not placeholders.
    pub fn publishing_configured(&self) -> bool {
        self.github_token.is_some() && self.github_owner.is_some()
    }
}

fn require_env(key: &str) -> Result<String> {
    let value = std::env::var(key)
        .with_context(|| format!("Required environment variable '{key}' is not set"))?;
    if value.trim().is_empty() {
        anyhow::bail!("Required environment variable '{key}' is empty");
    }
    Ok(value)
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: '{raw}'")),
        Err(_) => Ok(default),
    }
}

/// Normalises an optional credential: blank or placeholder values become `None`.
fn configured(value: Option<String>, placeholder: &str) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && v != placeholder)
}

/// Returns the value only if it is usable as a hosting token.
pub fn configured_token(value: Option<String>) -> Option<String> {
    configured(value, TOKEN_PLACEHOLDER)
}

/// Returns the value only if it is usable as a hosting owner.
pub fn configured_owner(value: Option<String>) -> Option<String> {
    configured(value, OWNER_PLACEHOLDER)
}
