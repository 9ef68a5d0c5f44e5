use anyhow::Context;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use location_service::{
    config::Config,
    handlers,
    services::{geocode::GoogleGeocoder, location::LocationService, mlab::MlabStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "location_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration; without a port or store location there is nothing to run
    dotenv::dotenv().ok();
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting location service");

    let store = MlabStore::new(
        &config.store_base_url,
        &config.location_url,
        config.mlab_api_key.clone(),
        config.http_timeout(),
    )
    .context("Failed to build document store client")?;
    info!("Using document store at {}", store.collection_url());

    let geocoder = GoogleGeocoder::new(
        config.geocode_url.clone(),
        config.geocode_api_key.clone(),
        config.http_timeout(),
    )
    .context("Failed to build geocoding client")?;

    let service = Arc::new(LocationService::new(
        Arc::new(store),
        Arc::new(geocoder),
        config.retention_policy(),
    ));

    // Purge stale locations now and then on the retention schedule
    service.start();

    let app = handlers::router(service.clone());

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("HTTP server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    service.stop();
    info!("Shutting down...");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
