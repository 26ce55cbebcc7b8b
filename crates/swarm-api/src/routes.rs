//! # HTTP Handlers
//!
//! Thin translation from REST and WebSocket requests to engine and hub calls.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};

use swarm_domain::{Drone, Waypoint};
use swarm_simulator::FleetSummary;

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::hub::WsSink;

/// Body of both command endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct CommandRequest {
    /// Missing means empty, which no drone acts on
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub waypoint: Option<Waypoint>,
}

impl CommandRequest {
    fn validated(self) -> ApiResult<Self> {
        if let Some(wp) = &self.waypoint {
            wp.validate()?;
        }
        Ok(self)
    }
}

/// Acknowledgement returned by command endpoints
#[derive(Debug, Serialize)]
pub struct CommandAck {
    pub status: &'static str,
}

const OK: CommandAck = CommandAck { status: "ok" };

/// `GET /api/drones`
pub async fn list_drones(State(state): State<AppState>) -> Json<Vec<Drone>> {
    Json(state.engine.drones().await)
}

/// `GET /api/drones/{id}`
pub async fn get_drone(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Drone>> {
    let drone = state.engine.drone(&id).await;
    drone.map(Json).ok_or_else(|| ApiError::drone_not_found(id))
}

/// `POST /api/drones/{id}/command`
pub async fn command_drone(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<CommandRequest>, JsonRejection>,
) -> ApiResult<Json<CommandAck>> {
    let Json(cmd) = body?;
    let cmd = cmd.validated()?;

    if !state.engine.command_drone(&id, &cmd.action, cmd.waypoint).await {
        return Err(ApiError::drone_not_found(id));
    }
    Ok(Json(OK))
}

/// `POST /api/swarm/command`
pub async fn command_swarm(
    State(state): State<AppState>,
    body: Result<Json<CommandRequest>, JsonRejection>,
) -> ApiResult<Json<CommandAck>> {
    let Json(cmd) = body?;
    let cmd = cmd.validated()?;

    state.engine.command_all(&cmd.action, cmd.waypoint).await;
    Ok(Json(OK))
}

/// Swarm status for monitoring
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub tick: u64,
    pub subscribers: usize,
    pub drones: usize,
    pub operational: usize,
    pub offline: usize,
    pub mean_battery: f64,
}

/// `GET /api/status`
pub async fn swarm_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let summary = FleetSummary::from_snapshot(&state.engine.drones().await);
    Json(StatusResponse {
        tick: state.engine.tick_count(),
        subscribers: state.hub.len().await,
        drones: summary.total,
        operational: summary.operational(),
        offline: summary.offline,
        mean_battery: summary.mean_battery,
    })
}

/// `GET /ws`
pub async fn telemetry_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        let (sink, stream) = socket.split();
        state.hub.subscribe(WsSink(sink), stream).await;
    })
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    "OK"
}
