mod config;
mod document;
mod errors;
mod generation;
mod llm_client;
mod render;
mod routes;
mod scratch;
mod state;
mod tailor;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::generation::{GenerationClient, RetryPolicy, TokioSleeper};
use crate::llm_client::{GeminiClient, GenerationConfig};
use crate::render::{build_backends, RenderOrchestrator};
use crate::routes::build_router;
use crate::state::AppState;
use crate::tailor::TailorService;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume Tailor API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize generation client (optional: requests fail with "not configured")
    let generator = match &config.gemini_api_key {
        Some(api_key) => {
            let provider = GeminiClient::new(GenerationConfig {
                model_id: config.gemini_model.clone(),
                base_url: config.gemini_base_url.clone(),
                ..GenerationConfig::new(api_key.clone())
            });
            let policy = RetryPolicy::new(
                config.generation_max_attempts,
                config.generation_base_delay,
            );
            info!(
                "Generation client initialized (model: {}, max attempts: {})",
                config.gemini_model, policy.max_attempts
            );
            Some(GenerationClient::new(
                Arc::new(provider),
                policy,
                Arc::new(TokioSleeper),
            ))
        }
        None => {
            warn!("GEMINI_API_KEY is not set; tailoring requests will be rejected");
            None
        }
    };

    // Initialize render backends in configured order
    let backends = build_backends(&config.render_backends, &config.render)?;
    let orchestrator = RenderOrchestrator::new(backends, config.min_artifact_bytes);
    info!("Render backends: {}", orchestrator.backend_names().join(" → "));

    if !config.resume_template_path.is_file() {
        warn!(
            "Resume template not found at {}",
            config.resume_template_path.display()
        );
    }

    // Build app state
    let state = AppState {
        tailor: Arc::new(TailorService::new(
            generator,
            orchestrator,
            config.resume_template_path.clone(),
            config.validation_mode,
        )),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict CORS origins once a frontend domain is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
