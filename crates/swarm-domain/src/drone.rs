//! Drone entity and its per-tick flight model.
//!
//! A drone only changes through [`Drone::tick`] and the two operator
//! commands. Heading and speed are outputs of the flight model.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::geo;
use crate::{
    ARRIVAL_RADIUS_M, CRUISE_SPEED_MPS, DroneCommand, DroneStatus, LOW_BATTERY_PCT,
    TICK_SECONDS, Waypoint,
};

/// Spread of spawn positions around home, in degrees per axis.
const SPAWN_SPREAD_DEG: f64 = 0.01;

/// What a single tick did to a drone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Offline, or holding position.
    Unchanged,
    /// Flew one step toward the waypoint.
    Moved,
    /// Reached a tasked waypoint and started loitering.
    Arrived,
    /// Reached home while returning and went idle.
    Homed,
    /// Battery dropped below the reserve and the drone turned for home.
    ///
    /// A drone already inside the arrival radius of home lands on the same
    /// tick and reports [`TickOutcome::Homed`] instead.
    LowBatteryReturn,
    /// Battery ran out.
    WentOffline,
}

/// Drone entity - one simulated aerial unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drone {
    id: String,
    lat: f64,
    lng: f64,
    altitude: f64,
    heading: f64,
    speed: f64,
    battery: f64,
    status: DroneStatus,
    home_lat: f64,
    home_lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    waypoint: Option<Waypoint>,
}

impl Drone {
    /// Create an idle drone with a randomized position near `home`.
    pub fn spawn<R: Rng + ?Sized>(id: impl Into<String>, home: Waypoint, rng: &mut R) -> Self {
        Self {
            id: id.into(),
            lat: home.lat + (rng.r#gen::<f64>() - 0.5) * SPAWN_SPREAD_DEG,
            lng: home.lng + (rng.r#gen::<f64>() - 0.5) * SPAWN_SPREAD_DEG,
            altitude: rng.gen_range(100.0..150.0),
            heading: rng.gen_range(0.0..360.0),
            speed: 0.0,
            battery: rng.gen_range(80.0..100.0),
            status: DroneStatus::Idle,
            home_lat: home.lat,
            home_lng: home.lng,
            waypoint: None,
        }
    }

    /// Create an idle, fully charged drone sitting exactly on `home`.
    pub fn at_home(id: impl Into<String>, home: Waypoint) -> Self {
        Self {
            id: id.into(),
            lat: home.lat,
            lng: home.lng,
            altitude: 120.0,
            heading: 0.0,
            speed: 0.0,
            battery: 100.0,
            status: DroneStatus::Idle,
            home_lat: home.lat,
            home_lng: home.lng,
            waypoint: None,
        }
    }

    /// Override the starting charge, clamped to [0, 100].
    #[must_use]
    pub fn with_battery(mut self, pct: f64) -> Self {
        self.battery = pct.clamp(0.0, 100.0);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub const fn position(&self) -> Waypoint {
        Waypoint::new(self.lat, self.lng)
    }

    #[must_use]
    pub const fn home(&self) -> Waypoint {
        Waypoint::new(self.home_lat, self.home_lng)
    }

    #[must_use]
    pub const fn altitude(&self) -> f64 {
        self.altitude
    }

    #[must_use]
    pub const fn heading(&self) -> f64 {
        self.heading
    }

    #[must_use]
    pub const fn speed(&self) -> f64 {
        self.speed
    }

    #[must_use]
    pub const fn battery(&self) -> f64 {
        self.battery
    }

    #[must_use]
    pub const fn status(&self) -> DroneStatus {
        self.status
    }

    #[must_use]
    pub const fn waypoint(&self) -> Option<Waypoint> {
        self.waypoint
    }

    #[must_use]
    pub fn is_offline(&self) -> bool {
        self.status == DroneStatus::Offline
    }

    /// Advance one tick of simulated time.
    pub fn tick(&mut self) -> TickOutcome {
        if self.is_offline() {
            return TickOutcome::Unchanged;
        }

        self.battery = (self.battery - self.status.drain_per_tick()).max(0.0);
        if self.battery <= 0.0 {
            self.status = DroneStatus::Offline;
            self.speed = 0.0;
            self.waypoint = None;
            return TickOutcome::WentOffline;
        }

        let mut outcome = TickOutcome::Unchanged;
        if self.battery < LOW_BATTERY_PCT
            && !matches!(self.status, DroneStatus::Idle | DroneStatus::Returning)
        {
            self.waypoint = Some(self.home());
            self.status = DroneStatus::Returning;
            outcome = TickOutcome::LowBatteryReturn;
        }

        let target = match self.waypoint {
            Some(wp) if self.status.is_navigating() => wp,
            _ => {
                self.speed = 0.0;
                return outcome;
            }
        };

        let here = self.position();
        if geo::haversine_m(here, target) < ARRIVAL_RADIUS_M {
            self.lat = target.lat;
            self.lng = target.lng;
            self.speed = 0.0;
            return if self.status == DroneStatus::Returning {
                self.status = DroneStatus::Idle;
                self.waypoint = None;
                TickOutcome::Homed
            } else {
                self.status = DroneStatus::Loitering;
                TickOutcome::Arrived
            };
        }

        self.speed = CRUISE_SPEED_MPS;
        self.heading = geo::initial_bearing_deg(here, target);
        let next = geo::destination_point(here, self.heading, CRUISE_SPEED_MPS * TICK_SECONDS);
        self.lat = next.lat;
        self.lng = next.lng;

        if outcome == TickOutcome::Unchanged {
            TickOutcome::Moved
        } else {
            outcome
        }
    }

    /// Send the drone to `wp`. No effect once offline.
    pub fn go_to(&mut self, wp: Waypoint) {
        if self.is_offline() {
            return;
        }
        self.waypoint = Some(wp);
        self.status = DroneStatus::Enroute;
    }

    /// Send the drone home. No effect once offline.
    pub fn recall(&mut self) {
        if self.is_offline() {
            return;
        }
        self.waypoint = Some(self.home());
        self.status = DroneStatus::Returning;
    }

    pub fn apply(&mut self, command: &DroneCommand) {
        match command {
            DroneCommand::GoTo(wp) => self.go_to(*wp),
            DroneCommand::Recall => self.recall(),
            DroneCommand::Ignored { .. } => {}
        }
    }
}
