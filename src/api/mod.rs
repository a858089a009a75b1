//! HTTP API handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::bus::SharedBus;
use crate::player::{PlayerCommand, PlayerView, XboxOnePlayer};
use crate::smartglass::models::ConnectionState;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub player: Arc<XboxOnePlayer>,
    pub bus: SharedBus,
}

impl AppState {
    pub fn new(player: Arc<XboxOnePlayer>, bus: SharedBus) -> Self {
        Self { player, bus }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// General status response
#[derive(Serialize)]
pub struct StatusResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub git_sha: &'static str,
    pub device_id: String,
    pub bridge_url: String,
    pub server_up: bool,
    pub server_compatible: bool,
    pub server_version: Option<String>,
    pub available: bool,
    pub connected: bool,
    pub connection: ConnectionState,
    pub bus_subscribers: usize,
}

/// GET /status - Service health check
pub async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    let client = state.player.client();
    let snapshot = client.snapshot();

    Json(StatusResponse {
        service: "smartglass-bridge",
        version: env!("SGB_VERSION"),
        git_sha: env!("SGB_GIT_SHA"),
        device_id: client.live_id().to_string(),
        bridge_url: client.base_url().to_string(),
        server_up: snapshot.server_up,
        server_compatible: snapshot.server_compatible,
        server_version: snapshot.server_version.clone(),
        available: snapshot.available,
        connected: snapshot.connected,
        connection: snapshot.connection_state(),
        bus_subscribers: state.bus.subscriber_count(),
    })
}

/// GET /player - Entity properties
pub async fn player_handler(State(state): State<AppState>) -> Json<PlayerView> {
    Json(state.player.view())
}

#[derive(Debug, Deserialize)]
pub struct ControlRequest {
    pub action: String,
}

#[derive(Debug, Deserialize)]
pub struct SourceRequest {
    pub source: String,
}

#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub success: bool,
}

/// POST /player/control - Transport, power and volume commands
pub async fn control_handler(
    State(state): State<AppState>,
    Json(req): Json<ControlRequest>,
) -> impl IntoResponse {
    let Some(command) = PlayerCommand::parse(&req.action) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("Unknown action: {}", req.action),
            }),
        )
            .into_response();
    };

    let result = state.player.execute(command).await;
    Json(CommandResponse {
        success: result.is_some(),
    })
    .into_response()
}

/// POST /player/source - Launch an app by name or URI
pub async fn source_handler(
    State(state): State<AppState>,
    Json(req): Json<SourceRequest>,
) -> impl IntoResponse {
    if req.source.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "source must not be empty".to_string(),
            }),
        )
            .into_response();
    }

    let result = state
        .player
        .execute(PlayerCommand::SelectSource(req.source))
        .await;
    Json(CommandResponse {
        success: result.is_some(),
    })
    .into_response()
}

/// POST /player/refresh - Refresh now instead of waiting for the next tick
pub async fn refresh_handler(State(state): State<AppState>) -> Json<PlayerView> {
    state.player.update().await;
    Json(state.player.view())
}
