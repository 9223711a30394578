use std::sync::Arc;

use errorfix_core::config::Settings;
use errorfix_core::gateway::GeminiBackend;
use errorfix_core::logging::init_logging;
use errorfix_core::network::server;
use errorfix_core::pipeline::ErrorFixPipeline;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging(std::env::var("ERRORFIX_LOG_JSON").is_ok_and(|v| v == "1"));

    let settings = Settings::from_env()?;
    let backend = Arc::new(GeminiBackend::new(settings.gemini_config())?);
    let pipeline = Arc::new(ErrorFixPipeline::from_settings(&settings, backend)?);

    let app = server::router(pipeline);

    let listener = tokio::net::TcpListener::bind(settings.bind).await?;
    info!(
        event = "listening",
        addr = %settings.bind,
        model = %settings.model,
        max_words = settings.max_words,
    );
    axum::serve(listener, app).await?;
    Ok(())
}
