//! Scheduler statistics.

use serde::{Deserialize, Serialize};

use crate::core::resources::{ResourceRequirements, ResourceUsage};

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Point-in-time scheduler statistics, derived on demand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskManagerStats {
    /// Tasks currently running.
    pub active_tasks: usize,
    /// Tasks waiting in the queue.
    pub queued_tasks: usize,
    /// Records in the completed bucket.
    pub completed_tasks: usize,
    /// Records in the failed bucket.
    pub failed_tasks: usize,
    /// Records with status cancelled.
    pub cancelled_tasks: usize,
    /// Records with status expired.
    pub expired_tasks: usize,
    /// Lifetime count of successful executions.
    pub total_executed: u64,
    /// `total_executed` divided by uptime in hours.
    pub throughput_per_hour: f64,
    /// Mean run time of completed tasks.
    pub average_execution_time_ms: f64,
    /// Mean time currently queued tasks have waited so far.
    pub queue_wait_time_ms: f64,
    /// Time since the scheduler was created.
    pub uptime_ms: u64,
    /// Last reported resource usage.
    pub resource_usage: ResourceUsage,
    /// Resources reserved by running tasks.
    pub reserved_resources: ResourceRequirements,
}

/// Executions per hour; zero before any time has passed.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn throughput_per_hour(total_executed: u64, uptime_ms: u64) -> f64 {
    if uptime_ms == 0 {
        return 0.0;
    }
    total_executed as f64 / (uptime_ms as f64 / MS_PER_HOUR)
}

/// Arithmetic mean, zero for an empty input.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn mean_ms(samples: impl Iterator<Item = u64>) -> f64 {
    let (sum, count) = samples.fold((0u128, 0u64), |(sum, n), v| (sum + u128::from(v), n + 1));
    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}
