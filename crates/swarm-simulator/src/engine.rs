//! Simulation engine owning the whole swarm.
//!
//! The drone collection sits behind one `RwLock`. The clock and every
//! command take it exclusively, queries share it. Snapshots are owned
//! copies, so nothing handed out can observe a half-finished tick.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rand::Rng;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use swarm_domain::{Drone, DroneCommand, DroneStatus, TickOutcome, Waypoint};

use crate::observer::TickObserver;

/// Owned copy of every drone, taken at one tick boundary.
pub type Snapshot = Vec<Drone>;

/// Engine construction parameters.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Home position shared by every drone
    pub center: Waypoint,
    /// Number of drones to spawn
    pub drone_count: usize,
    /// Wall-clock time between ticks
    pub tick_interval: Duration,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            center: Waypoint::new(38.9, -77.0),
            drone_count: 30,
            tick_interval: Duration::from_millis(500),
        }
    }
}

/// Fixed-interval swarm simulation.
pub struct Engine {
    drones: RwLock<BTreeMap<String, Drone>>,
    observer: Option<Arc<dyn TickObserver>>,
    tick_interval: Duration,
    ticks: AtomicU64,
}

impl Engine {
    /// Spawn `count` drones around the given center with the default clock.
    pub fn new(center_lat: f64, center_lng: f64, count: usize) -> Self {
        Self::from_config(&SimConfig {
            center: Waypoint::new(center_lat, center_lng),
            drone_count: count,
            ..SimConfig::default()
        })
    }

    /// Spawn the swarm described by `config` using the thread-local RNG.
    pub fn from_config(config: &SimConfig) -> Self {
        Self::with_rng(config, &mut rand::thread_rng())
    }

    /// Spawn the swarm described by `config`, drawing positions from `rng`.
    pub fn with_rng<R: Rng + ?Sized>(config: &SimConfig, rng: &mut R) -> Self {
        let drones = (1..=config.drone_count)
            .map(|n| Drone::spawn(format!("DRONE-{n:03}"), config.center, &mut *rng));
        Self::from_drones(drones, config.tick_interval)
    }

    /// Build an engine around an existing set of drones.
    pub fn from_drones(drones: impl IntoIterator<Item = Drone>, tick_interval: Duration) -> Self {
        let drones = drones
            .into_iter()
            .map(|d| (d.id().to_string(), d))
            .collect();

        Self {
            drones: RwLock::new(drones),
            observer: None,
            tick_interval,
            ticks: AtomicU64::new(0),
        }
    }

    /// Set the observer notified after every clock tick, replacing any previous one.
    ///
    /// Needs `&mut self`, so it can only happen before the engine is shared
    /// and its clock started.
    pub fn register_on_tick(&mut self, observer: Arc<dyn TickObserver>) {
        self.observer = Some(observer);
    }

    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Number of completed ticks.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Start the clock. Runs for the lifetime of the runtime.
    ///
    /// Firings that come due while the previous tick and its observer call
    /// are still running are dropped, not queued. After an overrun the next
    /// tick lands on the next period boundary.
    pub fn run(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut clock = interval(self.tick_interval);
            clock.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick of a tokio interval completes immediately.
            clock.tick().await;

            info!(
                interval_ms = self.tick_interval.as_millis(),
                observer = self.observer.is_some(),
                "Simulation clock started"
            );

            let mut busy_until = Instant::now();
            loop {
                // Skip still yields the overdue firing once; drop it here.
                let due = clock.tick().await;
                if due < busy_until {
                    debug!(
                        late_ms = busy_until.duration_since(due).as_millis(),
                        "Tick overran, dropping firing"
                    );
                    continue;
                }

                let snapshot = self.step().await;
                if let Some(observer) = &self.observer {
                    observer.on_tick(&snapshot).await;
                }
                busy_until = Instant::now();
            }
        })
    }

    /// Advance every drone one tick and return the resulting snapshot.
    ///
    /// This is the clock's work minus the observer call.
    pub async fn step(&self) -> Snapshot {
        let mut drones = self.drones.write().await;
        let tick = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;

        for drone in drones.values_mut() {
            let outcome = drone.tick();
            log_transition(tick, drone, outcome);
        }
        let snapshot: Snapshot = drones.values().cloned().collect();
        drop(drones);

        debug!(
            tick,
            drones = snapshot.len(),
            offline = snapshot.iter().filter(|d| d.is_offline()).count(),
            "Tick complete"
        );
        snapshot
    }

    /// Snapshot of every drone. May run alongside other readers.
    pub async fn drones(&self) -> Snapshot {
        self.drones.read().await.values().cloned().collect()
    }

    /// Copy of a single drone, if it exists.
    pub async fn drone(&self, id: &str) -> Option<Drone> {
        self.drones.read().await.get(id).cloned()
    }

    /// Apply `action` to one drone. Returns `false` only when `id` is unknown.
    ///
    /// Unrecognized actions, and `goto` without a waypoint, are accepted and
    /// leave the drone untouched.
    pub async fn command_drone(&self, id: &str, action: &str, waypoint: Option<Waypoint>) -> bool {
        let command = DroneCommand::parse(action, waypoint);
        let mut drones = self.drones.write().await;

        let Some(drone) = drones.get_mut(id) else {
            debug!(drone_id = %id, action, "Command for unknown drone");
            return false;
        };

        warn_if_ignored(&command);
        drone.apply(&command);
        info!(drone_id = %id, action, status = %drone.status(), "Drone commanded");
        true
    }

    /// Apply `action` to every drone.
    pub async fn command_all(&self, action: &str, waypoint: Option<Waypoint>) {
        let command = DroneCommand::parse(action, waypoint);
        let mut drones = self.drones.write().await;

        warn_if_ignored(&command);
        for drone in drones.values_mut() {
            drone.apply(&command);
        }
        info!(action, drones = drones.len(), "Swarm commanded");
    }
}

fn warn_if_ignored(command: &DroneCommand) {
    if let DroneCommand::Ignored { action } = command {
        warn!(action = %action, "Ignoring unrecognized or incomplete command");
    }
}

fn log_transition(tick: u64, drone: &Drone, outcome: TickOutcome) {
    match outcome {
        TickOutcome::Unchanged | TickOutcome::Moved => {}
        TickOutcome::Arrived => {
            info!(tick, drone_id = %drone.id(), "Arrived at waypoint, loitering");
        }
        TickOutcome::Homed => {
            info!(tick, drone_id = %drone.id(), "Returned home");
        }
        TickOutcome::LowBatteryReturn => {
            warn!(
                tick,
                drone_id = %drone.id(),
                battery = drone.battery(),
                "Low battery, returning home"
            );
        }
        TickOutcome::WentOffline => {
            warn!(tick, drone_id = %drone.id(), status = %DroneStatus::Offline, "Battery depleted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::FnObserver;
    use async_trait::async_trait;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    const HOME: Waypoint = Waypoint::new(38.9, -77.0);

    fn seeded_engine(count: usize) -> Engine {
        let config = SimConfig {
            drone_count: count,
            ..SimConfig::default()
        };
        Engine::with_rng(&config, &mut StdRng::seed_from_u64(1))
    }

    fn pair_at_home() -> Engine {
        Engine::from_drones(
            [Drone::at_home("A", HOME), Drone::at_home("B", HOME)],
            Duration::from_millis(500),
        )
    }

    #[tokio::test]
    async fn test_new_engine_spawns_sequential_idle_drones() {
        let engine = Engine::new(38.9, -77.0, 12);
        let drones = engine.drones().await;

        assert_eq!(drones.len(), 12);
        assert_eq!(drones[0].id(), "DRONE-001");
        assert_eq!(drones[11].id(), "DRONE-012");
        assert!(drones.iter().all(|d| d.status() == DroneStatus::Idle));
        assert!(drones.iter().all(|d| d.home() == HOME));
        assert_eq!(engine.tick_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_drone_is_not_found_and_changes_nothing() {
        let engine = seeded_engine(5);
        let before = engine.drones().await;

        let found = engine
            .command_drone("DRONE-999", "goto", Some(Waypoint::new(39.0, -77.0)))
            .await;

        assert!(!found);
        assert_eq!(engine.drones().await, before);
    }

    #[tokio::test]
    async fn test_unknown_action_is_accepted_as_noop() {
        let engine = seeded_engine(3);
        let before = engine.drones().await;

        assert!(engine.command_drone("DRONE-002", "barrel-roll", None).await);
        assert!(engine.command_drone("DRONE-002", "goto", None).await);
        engine.command_all("scatter", Some(HOME)).await;

        assert_eq!(engine.drones().await, before);
    }

    #[tokio::test]
    async fn test_goto_command_is_reflected_in_next_tick() {
        let engine = pair_at_home();
        let target = Waypoint::new(38.9005, -77.0);

        assert!(engine.command_drone("A", "goto", Some(target)).await);
        let snapshot = engine.step().await;

        let a = snapshot.iter().find(|d| d.id() == "A").unwrap();
        let b = snapshot.iter().find(|d| d.id() == "B").unwrap();
        assert_eq!(a.status(), DroneStatus::Enroute);
        assert_eq!(a.waypoint(), Some(target));
        assert!(a.speed() > 0.0);
        assert_eq!(b.status(), DroneStatus::Idle);

        let snapshot = engine.step().await;
        let a = snapshot.iter().find(|d| d.id() == "A").unwrap();
        assert_eq!(a.status(), DroneStatus::Loitering);
        assert_eq!(a.position(), target);
    }

    #[tokio::test]
    async fn test_command_all_recalls_everyone() {
        let engine = pair_at_home();
        engine.command_all("goto", Some(Waypoint::new(38.92, -77.0))).await;
        for _ in 0..5 {
            engine.step().await;
        }

        engine.command_all("recall", None).await;
        let drones = engine.drones().await;
        assert!(drones.iter().all(|d| d.status() == DroneStatus::Returning));
        assert!(drones.iter().all(|d| d.waypoint() == Some(HOME)));
    }

    #[tokio::test]
    async fn test_snapshots_are_independent_copies() {
        let engine = seeded_engine(4);
        let first = engine.step().await;
        let kept = first.clone();

        engine.command_all("goto", Some(Waypoint::new(38.95, -77.0))).await;
        engine.step().await;

        assert_eq!(first, kept);
        assert_ne!(engine.drones().await, first);
        assert_eq!(engine.tick_count(), 2);
    }

    #[tokio::test]
    async fn test_step_snapshot_matches_state() {
        let engine = seeded_engine(6);
        engine.command_drone("DRONE-003", "goto", Some(Waypoint::new(38.91, -77.0))).await;
        let snapshot = engine.step().await;
        assert_eq!(snapshot, engine.drones().await);
        assert_eq!(engine.drone("DRONE-003").await.as_ref(), snapshot.get(2));
        assert!(engine.drone("nope").await.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_commands_and_reads() {
        let engine = Arc::new(seeded_engine(20));
        let mut tasks = Vec::new();

        for n in 1..=20 {
            let engine = Arc::clone(&engine);
            tasks.push(tokio::spawn(async move {
                let id = format!("DRONE-{n:03}");
                let target = Waypoint::new(38.9 + f64::from(n) * 0.001, -77.0);
                assert!(engine.command_drone(&id, "goto", Some(target)).await);
                engine.step().await;
                assert_eq!(engine.drones().await.len(), 20);
            }));
        }
        for task in tasks {
            tokio_test::assert_ok!(task.await);
        }

        assert_eq!(engine.tick_count(), 20);
        let drones = engine.drones().await;
        assert!(drones.iter().all(|d| d.status() != DroneStatus::Idle));
        assert!(drones.iter().all(|d| (0.0..=100.0).contains(&d.battery())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_notifies_observer_each_tick() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut engine = seeded_engine(3);
        engine.register_on_tick(Arc::new(FnObserver(move |snapshot: &[Drone]| {
            sink.lock().unwrap().push(snapshot.len());
        })));
        let engine = Arc::new(engine);
        let handle = Arc::clone(&engine).run();

        tokio::time::sleep(Duration::from_millis(1_600)).await;
        handle.abort();

        assert_eq!(*seen.lock().unwrap(), vec![3, 3, 3]);
        assert_eq!(engine.tick_count(), 3);
    }

    struct SlowObserver {
        calls: AtomicUsize,
        delay: Duration,
    }

    #[async_trait]
    impl TickObserver for SlowObserver {
        async fn on_tick(&self, _snapshot: &[Drone]) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_overrun_skips_missed_ticks() {
        // Each notification takes 1.2 s against a 0.5 s clock. Ticks start
        // at 0.5, 2.0, 3.5, 5.0 and 6.5 s; nothing queues up in between.
        let observer = Arc::new(SlowObserver {
            calls: AtomicUsize::new(0),
            delay: Duration::from_millis(1_200),
        });

        let mut engine = seeded_engine(2);
        engine.register_on_tick(observer.clone());
        let engine = Arc::new(engine);
        let handle = Arc::clone(&engine).run();

        tokio::time::sleep(Duration::from_millis(7_000)).await;
        handle.abort();

        assert_eq!(observer.calls.load(Ordering::SeqCst), 5);
        assert_eq!(engine.tick_count(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_register_replaces_observer() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let mut engine = seeded_engine(1);
        let counter = Arc::clone(&first);
        engine.register_on_tick(Arc::new(FnObserver(move |_: &[Drone]| {
            counter.fetch_add(1, Ordering::SeqCst);
        })));
        let counter = Arc::clone(&second);
        engine.register_on_tick(Arc::new(FnObserver(move |_: &[Drone]| {
            counter.fetch_add(1, Ordering::SeqCst);
        })));

        let handle = Arc::new(engine).run();
        tokio::time::sleep(Duration::from_millis(1_100)).await;
        handle.abort();

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 2);
    }
}
