//! Scheduler configuration structures.

use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::{AppResult, ResourceLimits};

/// Prefix of the environment variables read by [`SchedulerConfig::from_env`].
pub const ENV_PREFIX: &str = "TASK_SCHEDULER_";

const fn default_admission_interval_ms() -> u64 {
    1_000
}

const fn default_cleanup_interval_ms() -> u64 {
    60_000
}

const fn default_retention_ms() -> u64 {
    24 * 60 * 60 * 1_000
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_admissions_per_tick() -> usize {
    1
}

const fn default_event_capacity() -> usize {
    1_024
}

/// Root scheduler configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Concurrency, queue, and resource limits.
    #[serde(default)]
    pub limits: ResourceLimits,
    /// Period of the admission tick.
    #[serde(default = "default_admission_interval_ms")]
    pub admission_interval_ms: u64,
    /// Period of the cleanup tick.
    #[serde(default = "default_cleanup_interval_ms")]
    pub cleanup_interval_ms: u64,
    /// Age after which terminal records are pruned by the cleanup tick.
    #[serde(default = "default_retention_ms")]
    pub retention_ms: u64,
    /// Retry budget for tasks that do not specify one.
    #[serde(default = "default_max_retries")]
    pub default_max_retries: u32,
    /// Upper bound on admissions made by a single tick.
    #[serde(default = "default_admissions_per_tick")]
    pub admissions_per_tick: usize,
    /// Supervising timeout around each execution attempt.
    #[serde(default)]
    pub execution_timeout_ms: Option<u64>,
    /// Per-subscriber buffer of the event broadcast channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            limits: ResourceLimits::default(),
            admission_interval_ms: default_admission_interval_ms(),
            cleanup_interval_ms: default_cleanup_interval_ms(),
            retention_ms: default_retention_ms(),
            default_max_retries: default_max_retries(),
            admissions_per_tick: default_admissions_per_tick(),
            execution_timeout_ms: None,
            event_capacity: default_event_capacity(),
        }
    }
}

impl SchedulerConfig {
    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        self.limits.validate()?;
        if self.admission_interval_ms == 0 {
            return Err("admission_interval_ms must be greater than 0".into());
        }
        if self.cleanup_interval_ms == 0 {
            return Err("cleanup_interval_ms must be greater than 0".into());
        }
        if self.admissions_per_tick == 0 {
            return Err("admissions_per_tick must be greater than 0".into());
        }
        if self.execution_timeout_ms == Some(0) {
            return Err("execution_timeout_ms must be greater than 0 when set".into());
        }
        if self.event_capacity == 0 {
            return Err("event_capacity must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse scheduler configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from defaults overridden by `TASK_SCHEDULER_*`
    /// environment variables. A `.env` file is loaded first when present.
    ///
    /// Recognized variables: `MAX_CONCURRENT_TASKS`, `MAX_QUEUE_SIZE`,
    /// `MAX_MEMORY_USAGE`, `MAX_CPU_USAGE`, `ADMISSION_INTERVAL_MS`,
    /// `CLEANUP_INTERVAL_MS`, `RETENTION_MS`, `DEFAULT_MAX_RETRIES`,
    /// `ADMISSIONS_PER_TICK`, `EXECUTION_TIMEOUT_MS`, `EVENT_CAPACITY`.
    ///
    /// # Errors
    ///
    /// A variable is set but does not parse, or the result fails validation.
    pub fn from_env() -> AppResult<Self> {
        // A missing .env file is the normal case.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`SchedulerConfig::from_env`], reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// A variable is set but does not parse, or the result fails validation.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let mut cfg = Self::default();
        let limits = &mut cfg.limits;
        override_from(&lookup, "MAX_CONCURRENT_TASKS", &mut limits.max_concurrent_tasks)?;
        override_from(&lookup, "MAX_QUEUE_SIZE", &mut limits.max_queue_size)?;
        override_from(&lookup, "MAX_MEMORY_USAGE", &mut limits.max_memory_usage)?;
        override_from(&lookup, "MAX_CPU_USAGE", &mut limits.max_cpu_usage)?;
        override_from(&lookup, "ADMISSION_INTERVAL_MS", &mut cfg.admission_interval_ms)?;
        override_from(&lookup, "CLEANUP_INTERVAL_MS", &mut cfg.cleanup_interval_ms)?;
        override_from(&lookup, "RETENTION_MS", &mut cfg.retention_ms)?;
        override_from(&lookup, "DEFAULT_MAX_RETRIES", &mut cfg.default_max_retries)?;
        override_from(&lookup, "ADMISSIONS_PER_TICK", &mut cfg.admissions_per_tick)?;
        override_from(&lookup, "EVENT_CAPACITY", &mut cfg.event_capacity)?;
        let mut timeout = 0u64;
        if override_from(&lookup, "EXECUTION_TIMEOUT_MS", &mut timeout)? {
            cfg.execution_timeout_ms = Some(timeout);
        }
        cfg.validate()
            .map_err(|e| anyhow::anyhow!("invalid scheduler config from environment: {e}"))?;
        Ok(cfg)
    }

    /// Admission tick period.
    #[must_use]
    pub const fn admission_interval(&self) -> Duration {
        Duration::from_millis(self.admission_interval_ms)
    }

    /// Cleanup tick period.
    #[must_use]
    pub const fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }

    /// Retention threshold used by the cleanup tick.
    #[must_use]
    pub const fn retention(&self) -> Duration {
        Duration::from_millis(self.retention_ms)
    }

    /// Supervising execution timeout, if configured.
    #[must_use]
    pub fn execution_timeout(&self) -> Option<Duration> {
        self.execution_timeout_ms.map(Duration::from_millis)
    }
}

fn override_from<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    target: &mut T,
) -> AppResult<bool>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let key = format!("{ENV_PREFIX}{name}");
    let Some(raw) = lookup(&key) else {
        return Ok(false);
    };
    *target = raw
        .trim()
        .parse()
        .with_context(|| format!("failed to parse {key}={raw:?}"))?;
    Ok(true)
}
