//! SmartGlass Bridge
//!
//! Polls an Xbox One SmartGlass REST bridge and serves the console as a
//! media player over HTTP.

use smartglass_bridge::poller::{ConsolePoller, Startable};
use smartglass_bridge::{api, bus, config, player};

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "smartglass_bridge=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Starting SmartGlass Bridge v{} ({})",
        env!("SGB_VERSION"),
        env!("SGB_GIT_SHA")
    );

    let config = config::load_config()?;
    tracing::info!(
        "Configuration loaded: console {} via {}",
        config.xbox.device,
        config.xbox.base_url()
    );

    let bus = bus::create_bus();

    let player = Arc::new(player::XboxOnePlayer::new(&config.xbox)?);
    let poller = ConsolePoller::new(
        player.clone(),
        bus.clone(),
        Duration::from_secs(config.poll_interval_secs),
    );
    poller.start().await?;
    tracing::info!("{} poller started", poller.name());

    let state = api::AppState::new(player, bus);

    let app = Router::new()
        .route("/status", get(api::status_handler))
        .route("/player", get(api::player_handler))
        .route("/player/control", post(api::control_handler))
        .route("/player/source", post(api::source_handler))
        .route("/player/refresh", post(api::refresh_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down poller...");
    poller.stop().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
