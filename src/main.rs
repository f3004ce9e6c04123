// Main entry point - Dependency injection and server setup
use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use air_quality_telemetry::application::ingest_service::IngestService;
use air_quality_telemetry::application::readings_service::ReadingsService;
use air_quality_telemetry::infrastructure::config::{load_influx_config, load_server_config};
use air_quality_telemetry::infrastructure::influx_repository::InfluxRepository;
use air_quality_telemetry::presentation::app_state::AppState;
use air_quality_telemetry::presentation::router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let influx_config = load_influx_config().context("Failed to load config/influx")?;
    let server_config = load_server_config().context("Failed to load config/server")?;

    // Create repository (infrastructure layer)
    let repository = Arc::new(InfluxRepository::new(influx_config.influx));

    // Create services (application layer)
    let readings_service =
        ReadingsService::new(repository.clone(), server_config.server.default_points);
    let ingest_service = IngestService::new(repository);

    // Create application state
    let state = Arc::new(AppState {
        readings_service,
        ingest_service,
    });

    // Build router (presentation layer)
    let app = router(state);

    // Start server
    let addr: SocketAddr = server_config
        .server
        .listen
        .parse()
        .with_context(|| format!("Invalid listen address {}", server_config.server.listen))?;
    tracing::info!(%addr, "Starting air-quality-telemetry service");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;

    Ok(())
}
