//! Scheduler configuration models.

pub mod scheduler;

pub use scheduler::{SchedulerConfig, ENV_PREFIX};
