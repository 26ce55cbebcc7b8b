//! Fleet-level roll-up of a snapshot, for logs and status endpoints.

use std::fmt;

use swarm_domain::{Drone, DroneStatus};

/// Status counts and battery statistics for one snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FleetSummary {
    pub total: usize,
    pub idle: usize,
    pub tasked: usize,
    pub enroute: usize,
    pub loitering: usize,
    pub returning: usize,
    pub offline: usize,
    pub mean_battery: f64,
    pub min_battery: f64,
}

impl FleetSummary {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_snapshot(drones: &[Drone]) -> Self {
        let mut summary = Self {
            total: drones.len(),
            ..Self::default()
        };
        if drones.is_empty() {
            return summary;
        }

        let mut battery_sum = 0.0;
        summary.min_battery = f64::MAX;
        for drone in drones {
            match drone.status() {
                DroneStatus::Idle => summary.idle += 1,
                DroneStatus::Tasked => summary.tasked += 1,
                DroneStatus::Enroute => summary.enroute += 1,
                DroneStatus::Loitering => summary.loitering += 1,
                DroneStatus::Returning => summary.returning += 1,
                DroneStatus::Offline => summary.offline += 1,
            }
            battery_sum += drone.battery();
            summary.min_battery = summary.min_battery.min(drone.battery());
        }

        summary.mean_battery = battery_sum / drones.len() as f64;
        summary
    }

    /// Drones that can still take commands.
    #[must_use]
    pub const fn operational(&self) -> usize {
        self.total - self.offline
    }
}

impl fmt::Display for FleetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} drones | idle {} | enroute {} | loiter {} | rtb {} | offline {} | battery avg {:.1}% min {:.1}%",
            self.total,
            self.idle,
            self.enroute + self.tasked,
            self.loitering,
            self.returning,
            self.offline,
            self.mean_battery,
            self.min_battery,
        )
    }
}
