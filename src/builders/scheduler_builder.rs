//! Builder assembling a [`Scheduler`] with its clock, executors, and listeners.

use std::sync::Arc;

use crate::config::SchedulerConfig;
use crate::core::{EventListener, Scheduler, SchedulerError, Spawn, TaskExecutor};
use crate::util::clock::{Clock, SystemClock};

/// Collects everything a scheduler needs at startup.
///
/// Executors and listeners are installed before the scheduler is returned, so
/// no submission can race an executor registration.
pub struct SchedulerBuilder<S> {
    config: SchedulerConfig,
    clock: Arc<dyn Clock>,
    spawner: S,
    executors: Vec<(String, Arc<dyn TaskExecutor>)>,
    listeners: Vec<Arc<dyn EventListener>>,
    start: bool,
}

impl<S> SchedulerBuilder<S>
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    /// Builder with default configuration and the system clock.
    pub fn new(spawner: S) -> Self {
        Self {
            config: SchedulerConfig::default(),
            clock: Arc::new(SystemClock),
            spawner,
            executors: Vec::new(),
            listeners: Vec::new(),
            start: false,
        }
    }

    /// Replace the configuration.
    #[must_use]
    pub fn config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Current configuration.
    #[must_use]
    pub const fn config_ref(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Inject a clock.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Register an executor for `task_type`.
    #[must_use]
    pub fn executor(mut self, task_type: impl Into<String>, executor: Arc<dyn TaskExecutor>) -> Self {
        self.executors.push((task_type.into(), executor));
        self
    }

    /// Register an event listener.
    #[must_use]
    pub fn listener(mut self, listener: Arc<dyn EventListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Start the periodic loops as part of [`SchedulerBuilder::build`].
    #[must_use]
    pub const fn start_loops(mut self, start: bool) -> Self {
        self.start = start;
        self
    }

    /// Build the scheduler.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::Config`] when the configuration is invalid.
    pub fn build(self) -> Result<Scheduler<S>, SchedulerError> {
        let scheduler = Scheduler::with_clock(self.config, self.clock, self.spawner)?;
        for listener in self.listeners {
            scheduler.add_listener(listener);
        }
        for (task_type, executor) in self.executors {
            scheduler.register_executor(task_type, executor);
        }
        if self.start {
            scheduler.start();
        }
        Ok(scheduler)
    }
}
