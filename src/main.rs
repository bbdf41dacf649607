//! Main entry point for the gateway resilience layer

use resilience_gateway::{
    api,
    config::Settings,
    health::{monitor::GatewayHealthMonitor, probe::ProbeClient},
    AppState,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json())
        .init();

    info!("Starting gateway resilience layer");

    // Load configuration
    let settings = Settings::load()?;
    settings.validate()?;
    info!(
        "Loaded configuration: server={}:{}, routes={}",
        settings.server.host,
        settings.server.port,
        settings.routes.len()
    );

    let (shutdown_tx, _) = broadcast::channel(1);

    // Start the background gateway monitor
    if settings.monitor.enabled {
        let monitor =
            GatewayHealthMonitor::new(ProbeClient::new()?, settings.monitor.clone());
        let shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            monitor.run(shutdown_rx).await;
        });
    }

    let addr = format!("{}:{}", settings.server.host, settings.server.port);

    // Create application state and build the router
    let app_state = Arc::new(AppState::from_settings(settings)?);
    let app = api::routes::create_router(app_state);

    info!("Server listening on {}", addr);

    // Start the server, shutting the monitor down when the server stops
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    let _ = shutdown_tx.send(());

    Ok(())
}
