//! # Swarm Lite - Domain Model
//!
//! Core domain entities, value objects, and enums for the simulated drone
//! swarm. These types are the single source of truth across all layers:
//! simulation engine, telemetry hub, and HTTP API.

pub mod drone;
pub mod geo;

use serde::{Deserialize, Serialize};

pub use drone::{Drone, TickOutcome};

// =============================================================================
// FLIGHT CONSTANTS
// =============================================================================

/// Cruise speed while navigating, in meters per second.
pub const CRUISE_SPEED_MPS: f64 = 15.0;

/// Distance at which a drone is considered to have reached its waypoint.
pub const ARRIVAL_RADIUS_M: f64 = 50.0;

/// Simulated seconds advanced by one tick.
pub const TICK_SECONDS: f64 = 0.5;

/// Battery level below which a working drone heads home on its own.
pub const LOW_BATTERY_PCT: f64 = 15.0;

// =============================================================================
// VALUE OBJECTS
// =============================================================================

/// Geographic target point in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub lat: f64,
    pub lng: f64,
}

impl Waypoint {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Reject points that cannot exist on the globe.
    pub fn validate(&self) -> Result<(), DomainError> {
        let lat_ok = self.lat.is_finite() && (-90.0..=90.0).contains(&self.lat);
        let lng_ok = self.lng.is_finite() && (-180.0..=180.0).contains(&self.lng);
        if lat_ok && lng_ok {
            Ok(())
        } else {
            Err(DomainError::InvalidCoordinates {
                lat: self.lat,
                lng: self.lng,
            })
        }
    }
}

// =============================================================================
// ENUMS
// =============================================================================

/// Drone operational status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DroneStatus {
    #[default]
    Idle,
    Tasked,
    Enroute,
    Loitering,
    Returning,
    Offline,
}

impl DroneStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Tasked => "tasked",
            Self::Enroute => "enroute",
            Self::Loitering => "loitering",
            Self::Returning => "returning",
            Self::Offline => "offline",
        }
    }

    /// Statuses in which the drone flies toward its waypoint.
    #[must_use]
    pub const fn is_navigating(&self) -> bool {
        matches!(self, Self::Enroute | Self::Tasked | Self::Returning)
    }

    /// Battery percentage consumed per tick in this status.
    #[must_use]
    pub const fn drain_per_tick(&self) -> f64 {
        match self {
            Self::Enroute | Self::Tasked | Self::Returning => 0.05,
            Self::Loitering => 0.02,
            Self::Idle => 0.01,
            Self::Offline => 0.0,
        }
    }
}

impl std::fmt::Display for DroneStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// COMMANDS
// =============================================================================

/// Operator instruction for one drone or the whole swarm
#[derive(Debug, Clone, PartialEq)]
pub enum DroneCommand {
    GoTo(Waypoint),
    Recall,
    /// Unrecognized action, or `goto` without a waypoint. Accepted and dropped.
    Ignored { action: String },
}

impl DroneCommand {
    /// Build a command from the wire form `{action, waypoint?}`.
    ///
    /// Unknown actions are not an error: callers report success and nothing
    /// happens to the drone.
    #[must_use]
    pub fn parse(action: &str, waypoint: Option<Waypoint>) -> Self {
        match (action, waypoint) {
            ("goto", Some(wp)) => Self::GoTo(wp),
            ("recall", _) => Self::Recall,
            _ => Self::Ignored {
                action: action.to_string(),
            },
        }
    }

    #[must_use]
    pub const fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored { .. })
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Domain-level errors
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Invalid coordinates: lat={lat}, lng={lng}")]
    InvalidCoordinates { lat: f64, lng: f64 },
}
