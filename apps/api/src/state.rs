use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::deploy::DeployTarget;
use crate::llm_client::SiteGenerator;
use crate::ocr_client::TextExtractor;
use crate::publisher::RepositoryPublisher;

/// Per-request limits and locations, derived from `Config` at startup.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub ocr_timeout: Duration,
    pub publish_timeout: Duration,
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            upload_dir: config.upload_dir.clone(),
            max_upload_bytes: config.max_upload_bytes,
            ocr_timeout: config.ocr_timeout,
            publish_timeout: config.publish_timeout,
        }
    }
}

/// Shared application state injected into all route handlers via Axum extractors.
/// Holds only immutable settings and provider clients; nothing request-scoped.
#[derive(Clone)]
pub struct AppState {
    pub extractor: Arc<dyn TextExtractor>,
    pub generator: Arc<dyn SiteGenerator>,
    /// Best-effort; failures are reported in the response, never raised.
    pub publisher: Arc<dyn RepositoryPublisher>,
    pub deploy_target: DeployTarget,
    pub settings: PipelineSettings,
}
