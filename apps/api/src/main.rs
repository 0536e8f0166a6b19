mod config;
mod deploy;
mod errors;
mod llm_client;
mod models;
mod ocr_client;
mod portfolio;
mod publisher;
mod routes;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::deploy::DeployTarget;
use crate::llm_client::{LlmClient, RetryPolicy};
use crate::ocr_client::OcrClient;
use crate::publisher::{GithubPublisher, SettlePolicy};
use crate::routes::build_router;
use crate::state::{AppState, PipelineSettings};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing provider keys)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Folio API v{}", env!("CARGO_PKG_VERSION"));

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create upload directory {}",
                config.upload_dir.display()
            )
        })?;

    let extractor = OcrClient::new(
        config.ocr_api_key.clone(),
        config.ocr_base_url.clone(),
        config.ocr_timeout,
    );

    let retry = RetryPolicy {
        max_attempts: config.generation_max_attempts,
        initial_delay: config.generation_initial_delay,
    };
    let generator = LlmClient::new(
        config.gemini_api_key.clone(),
        config.gemini_base_url.clone(),
        config.gemini_model.clone(),
        retry,
    );
    info!("LLM client initialized (model: {})", generator.model());

    if !config.publishing_configured() {
        warn!(
            "GITHUB_TOKEN/GITHUB_OWNER not configured; \
             portfolios will be generated but not published"
        );
    }
    let settle = match config.repo_settle_polls {
        0 => SettlePolicy::Fixed(config.repo_settle),
        max_polls => SettlePolicy::PollBranch {
            interval: config.repo_settle,
            max_polls,
        },
    };
    let publisher = GithubPublisher::new(
        config.github_api_url.clone(),
        config.github_token.clone(),
        config.github_owner.clone(),
        settle,
        config.upload_dir.join("published"),
    );

    let state = AppState {
        extractor: Arc::new(extractor),
        generator: Arc::new(generator),
        publisher: Arc::new(publisher),
        deploy_target: DeployTarget::new(config.deploy_url_template.clone()),
        settings: PipelineSettings::from(&config),
    };

    // TODO: restrict origins once the web client has a fixed host
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
