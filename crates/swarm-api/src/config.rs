//! # API Configuration
//!
//! Environment-based configuration for the swarm server.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use swarm_domain::Waypoint;
use swarm_simulator::SimConfig;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address
    pub server_addr: SocketAddr,

    /// Simulation parameters
    pub sim: SimConfig,

    /// Bound on a single telemetry write to one subscriber
    pub write_timeout: Duration,

    /// Logging level
    pub log_level: String,

    /// CORS allowed origins
    pub cors_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = SimConfig::default();

        let center = Waypoint::new(
            parse_or(&lookup, "CENTER_LAT", defaults.center.lat)?,
            parse_or(&lookup, "CENTER_LNG", defaults.center.lng)?,
        );
        if center.validate().is_err() {
            return Err(ConfigError::Invalid {
                key: "CENTER_LAT/CENTER_LNG",
                value: format!("{}, {}", center.lat, center.lng),
            });
        }

        let tick_ms: u64 = parse_or(&lookup, "TICK_MS", 500)?;
        if tick_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "TICK_MS",
                value: tick_ms.to_string(),
            });
        }

        let write_timeout_ms: u64 = parse_or(&lookup, "WRITE_TIMEOUT_MS", 1_000)?;
        if write_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "WRITE_TIMEOUT_MS",
                value: write_timeout_ms.to_string(),
            });
        }

        Ok(Self {
            server_addr: parse_or(&lookup, "SERVER_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080)))?,

            sim: SimConfig {
                center,
                drone_count: parse_or(&lookup, "DRONE_COUNT", defaults.drone_count)?,
                tick_interval: Duration::from_millis(tick_ms),
            },

            write_timeout: Duration::from_millis(write_timeout_ms),

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),

            cors_origins: lookup("CORS_ORIGINS")
                .unwrap_or_else(|| "*".to_string())
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect(),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}
