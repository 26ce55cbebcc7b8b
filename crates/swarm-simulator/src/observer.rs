//! Post-tick notification seam.

use async_trait::async_trait;
use swarm_domain::Drone;

/// Receives every snapshot the engine clock produces.
///
/// Called outside the engine lock. The clock waits for `on_tick` to return
/// before it can fire again, so a slow observer causes ticks to be skipped.
#[async_trait]
pub trait TickObserver: Send + Sync {
    async fn on_tick(&self, snapshot: &[Drone]);
}

/// Adapts a plain closure into a [`TickObserver`].
pub struct FnObserver<F>(pub F);

#[async_trait]
impl<F> TickObserver for FnObserver<F>
where
    F: Fn(&[Drone]) + Send + Sync,
{
    async fn on_tick(&self, snapshot: &[Drone]) {
        (self.0)(snapshot);
    }
}
