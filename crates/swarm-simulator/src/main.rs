//! Swarm Simulator CLI
//!
//! Runs the engine headless and logs a fleet summary every tick.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;
use clap::Parser;
use swarm_domain::{Drone, Waypoint};
use swarm_simulator::{Engine, FleetSummary, SimConfig, TickObserver};
use tokio::time::{MissedTickBehavior, interval};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "swarm-simulator")]
#[command(about = "Simulate a drone swarm without the HTTP layer")]
struct Args {
    /// Number of drones
    #[arg(short, long, default_value = "30")]
    drones: usize,

    /// Home latitude
    #[arg(long, default_value = "38.9", allow_hyphen_values = true)]
    lat: f64,

    /// Home longitude
    #[arg(long, default_value = "-77.0", allow_hyphen_values = true)]
    lng: f64,

    /// Tick interval in milliseconds
    #[arg(long, default_value = "500")]
    tick_ms: u64,

    /// Stop after this many ticks (0 runs forever)
    #[arg(long, default_value = "0")]
    ticks: u64,

    /// Send the whole swarm to this latitude at start
    #[arg(long, requires = "goto_lng", allow_hyphen_values = true)]
    goto_lat: Option<f64>,

    /// Send the whole swarm to this longitude at start
    #[arg(long, requires = "goto_lat", allow_hyphen_values = true)]
    goto_lng: Option<f64>,

    /// Recall the swarm at this tick
    #[arg(long)]
    recall_at: Option<u64>,
}

/// Logs one summary line per tick.
struct SummaryLogger;

#[async_trait]
impl TickObserver for SummaryLogger {
    async fn on_tick(&self, snapshot: &[Drone]) {
        info!("{}", FleetSummary::from_snapshot(snapshot));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("swarm_simulator=info".parse()?))
        .init();

    let args = Args::parse();
    if args.tick_ms == 0 {
        bail!("--tick-ms must be greater than zero");
    }

    let center = Waypoint::new(args.lat, args.lng);
    center.validate()?;
    let config = SimConfig {
        center,
        drone_count: args.drones,
        tick_interval: Duration::from_millis(args.tick_ms),
    };

    info!(
        "Starting swarm simulation: {} drones around ({}, {})",
        args.drones, args.lat, args.lng
    );

    let mut engine = Engine::from_config(&config);
    let logger = Arc::new(SummaryLogger);
    engine.register_on_tick(logger.clone());
    let engine = Arc::new(engine);

    if let (Some(lat), Some(lng)) = (args.goto_lat, args.goto_lng) {
        let target = Waypoint::new(lat, lng);
        target.validate()?;
        engine.command_all("goto", Some(target)).await;
    }

    if args.ticks == 0 && args.recall_at.is_none() {
        Arc::clone(&engine).run().await?;
        return Ok(());
    }

    // Bounded or scripted run: drive the clock here so commands land between ticks.
    let mut clock = interval(config.tick_interval);
    clock.set_missed_tick_behavior(MissedTickBehavior::Skip);
    clock.tick().await;

    let mut tick = 0;
    while args.ticks == 0 || tick < args.ticks {
        clock.tick().await;
        tick += 1;
        let snapshot = engine.step().await;
        logger.on_tick(&snapshot).await;

        if args.recall_at == Some(tick) {
            info!(tick, "Recalling swarm");
            engine.command_all("recall", None).await;
        }
    }

    info!("Simulation complete after {} ticks", tick);
    info!("=== FINAL STATE ===");
    for drone in engine.drones().await {
        info!(
            "{} {} | battery {:.1}% | ({:.5}, {:.5})",
            drone.id(),
            drone.status(),
            drone.battery(),
            drone.position().lat,
            drone.position().lng
        );
    }

    Ok(())
}
