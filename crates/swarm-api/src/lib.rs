//! # Swarm Lite API
//!
//! HTTP and WebSocket front end for the drone swarm simulation.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Axum HTTP Server                         │
//! │         (REST queries/commands + /ws telemetry feed)        │
//! └─────────────────────────────────────────────────────────────┘
//!                    │                   ▲
//!        queries &   │                   │ subscribe
//!        commands    ▼                   │
//! ┌─────────────────────────┐   ┌──────────────────────────────┐
//! │   Simulation Engine     │──▶│        Telemetry Hub         │
//! │  (RwLock'd drone map,   │   │  (Mutex'd subscriber set,    │
//! │   500 ms skip clock)    │   │   encode once, fan out)      │
//! └─────────────────────────┘   └──────────────────────────────┘
//!              on_tick(snapshot)
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod hub;
pub mod routes;

use std::sync::Arc;

use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use swarm_simulator::Engine;

pub use config::Config;
pub use error::{ApiError, ApiResult, HubError};
pub use hub::{Hub, TelemetryMessage, TelemetrySink, WsSink};

/// Application state for Axum handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub hub: Arc<Hub>,
}

/// Build the CORS layer from configured origins. `*` allows any origin.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring unparsable CORS origin");
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(allowed))
}

/// Build the Axum router
pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/api/drones", get(routes::list_drones))
        .route("/api/drones/{id}", get(routes::get_drone))
        .route("/api/drones/{id}/command", post(routes::command_drone))
        .route("/api/swarm/command", post(routes::command_swarm))
        .route("/api/status", get(routes::swarm_status))
        .route("/ws", get(routes::telemetry_ws))
        .route("/health", get(routes::health_check))
        .with_state(state)
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
