//! Main entry point for the Scene Studio service

use scene_studio::{api, config::Settings, AppState};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional; real deployments inject the environment directly
    let _ = dotenvy::dotenv();

    let settings = Settings::load()?;
    init_logging(&settings.logging.level, &settings.logging.format);

    info!("Starting Scene Studio");
    settings.validate()?;
    info!(
        host = %settings.server.host,
        port = settings.server.port,
        storage = ?settings.storage.backend,
        image_model = %settings.generation.image_model,
        max_attempts = settings.retry.max_attempts,
        "Loaded configuration"
    );

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let sweep_interval = settings.view.session_sweep_interval();
    let app_state = Arc::new(AppState::from_settings(settings)?);
    app_state.sessions.start_sweeper(sweep_interval);
    let app = api::create_router(app_state);

    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_logging(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    if format == "json" {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
