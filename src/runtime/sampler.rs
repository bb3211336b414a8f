//! Periodic resource sampling feeding [`Scheduler::update_resource_usage`].
//!
//! The scheduler never polls system resources itself. A sampler reports usage
//! on its own schedule; if it stops or fails, the last snapshot stays in effect.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::core::{AppResult, Scheduler, Spawn};

/// One usage reading, in the same units as the configured limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceSample {
    /// Memory in use.
    pub memory: f64,
    /// CPU in use.
    pub cpu: f64,
}

/// Source of system resource readings.
#[async_trait]
pub trait ResourceSampler: Send + Sync + 'static {
    /// Take one reading.
    ///
    /// # Errors
    ///
    /// The reading could not be taken; the scheduler keeps its previous snapshot.
    async fn sample(&self) -> AppResult<ResourceSample>;
}

/// Spawn a loop that samples every `period` and reports into `scheduler`
/// until the scheduler shuts down.
pub fn spawn_sampler_loop<S>(
    scheduler: &Scheduler<S>,
    sampler: Arc<dyn ResourceSampler>,
    period: Duration,
) where
    S: Spawn + Clone + Send + Sync + 'static,
{
    let target = scheduler.clone();
    let stop = scheduler.shutdown_signal();
    scheduler.spawn_background(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                () = stop.cancelled() => break,
                _ = interval.tick() => match sampler.sample().await {
                    Ok(sample) => target.update_resource_usage(sample.memory, sample.cpu),
                    Err(e) => warn!(error = %e, "resource sampling failed; keeping last snapshot"),
                },
            }
        }
        debug!("resource sampler loop stopped");
    });
}
