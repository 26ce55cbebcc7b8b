//! # Swarm Lite Server
//!
//! Binary entry point: wires the engine to the hub and serves the API.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use swarm_api::{AppState, Config, Hub, build_router};
use swarm_simulator::Engine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!(
        version = swarm_api::VERSION,
        drones = config.sim.drone_count,
        center_lat = config.sim.center.lat,
        center_lng = config.sim.center.lng,
        tick_ms = config.sim.tick_interval.as_millis(),
        "Starting swarm-lite backend"
    );

    let hub = Arc::new(Hub::with_write_timeout(config.write_timeout));
    tracing::debug!(write_timeout_ms = hub.write_timeout().as_millis(), "Telemetry hub ready");
    let mut engine = Engine::from_config(&config.sim);
    engine.register_on_tick(hub.clone());
    let engine = Arc::new(engine);
    let _clock = Arc::clone(&engine).run();

    let app = build_router(AppState { engine, hub }, &config.cors_origins);

    // Start server
    let addr = config.server_addr;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "swarm-lite backend listening");
    tracing::info!("Telemetry stream at ws://{}/ws", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}
