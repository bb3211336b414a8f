//! Resource limits, usage snapshots, and the admission-side resource tracker.

use serde::{Deserialize, Serialize};

/// Configured capacity for the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Maximum tasks running at once.
    pub max_concurrent_tasks: usize,
    /// Maximum tasks waiting in the queue.
    pub max_queue_size: usize,
    /// Memory budget (percent of system memory).
    pub max_memory_usage: f64,
    /// CPU budget (percent of system CPU).
    pub max_cpu_usage: f64,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: num_cpus::get().max(1),
            max_queue_size: 1000,
            max_memory_usage: 80.0,
            max_cpu_usage: 80.0,
        }
    }
}

impl ResourceLimits {
    /// Validate limit values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_tasks == 0 {
            return Err("max_concurrent_tasks must be greater than 0".into());
        }
        if self.max_queue_size == 0 {
            return Err("max_queue_size must be greater than 0".into());
        }
        if !(self.max_memory_usage.is_finite() && self.max_memory_usage > 0.0) {
            return Err("max_memory_usage must be a positive number".into());
        }
        if !(self.max_cpu_usage.is_finite() && self.max_cpu_usage > 0.0) {
            return Err("max_cpu_usage must be a positive number".into());
        }
        Ok(())
    }
}

/// Resources an executor expects a task to consume, in the same units as [`ResourceLimits`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceRequirements {
    /// Memory share.
    pub memory: f64,
    /// CPU share.
    pub cpu: f64,
}

impl ResourceRequirements {
    /// Build a requirement pair.
    #[must_use]
    pub const fn new(memory: f64, cpu: f64) -> Self {
        Self { memory, cpu }
    }
}

/// Last usage snapshot reported by the sampler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    /// Memory in use.
    pub memory: f64,
    /// CPU in use.
    pub cpu: f64,
    /// When the snapshot was reported (epoch ms); `None` before the first report.
    pub reported_at_ms: Option<u64>,
}

/// Holds reported usage, configured limits, and reservations of admitted tasks.
///
/// A task fits when its requirements fit under the limit on top of the reported
/// usage *and* on top of what running tasks already reserved. Stale reports are
/// used as-is.
#[derive(Debug, Clone)]
pub struct ResourceTracker {
    limits: ResourceLimits,
    reported: ResourceUsage,
    reserved: ResourceRequirements,
}

impl ResourceTracker {
    /// Create a tracker with zero usage.
    #[must_use]
    pub fn new(limits: ResourceLimits) -> Self {
        Self {
            limits,
            reported: ResourceUsage::default(),
            reserved: ResourceRequirements::default(),
        }
    }

    /// Replace the reported usage snapshot.
    pub fn update(&mut self, memory: f64, cpu: f64, now_ms: u64) -> ResourceUsage {
        self.reported = ResourceUsage {
            memory,
            cpu,
            reported_at_ms: Some(now_ms),
        };
        self.reported
    }

    /// Last reported usage.
    #[must_use]
    pub const fn usage(&self) -> ResourceUsage {
        self.reported
    }

    /// Sum of requirements of admitted, unsettled tasks.
    #[must_use]
    pub const fn reserved(&self) -> ResourceRequirements {
        self.reserved
    }

    /// Whether `req` fits the remaining budget in every dimension.
    #[must_use]
    pub fn fits(&self, req: &ResourceRequirements) -> bool {
        let memory_limit = self.limits.max_memory_usage;
        let cpu_limit = self.limits.max_cpu_usage;
        self.reported.memory + req.memory <= memory_limit
            && self.reported.cpu + req.cpu <= cpu_limit
            && self.reserved.memory + req.memory <= memory_limit
            && self.reserved.cpu + req.cpu <= cpu_limit
    }

    /// Record an admission.
    pub fn reserve(&mut self, req: &ResourceRequirements) {
        self.reserved.memory += req.memory;
        self.reserved.cpu += req.cpu;
    }

    /// Return a settled or cancelled task's reservation.
    pub fn release(&mut self, req: &ResourceRequirements) {
        self.reserved.memory = (self.reserved.memory - req.memory).max(0.0);
        self.reserved.cpu = (self.reserved.cpu - req.cpu).max(0.0);
    }
}
