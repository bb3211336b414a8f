//! Executor capability trait, execution context, and the executor registry.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::core::error::ExecutionError;
use crate::core::resources::ResourceRequirements;
use crate::core::task::{Task, TaskId};

/// Type-specific capability that performs the work for a task.
///
/// `can_execute`, `estimated_duration` and `resource_requirements` feed the
/// admission heuristics and must be cheap and deterministic. The scheduler
/// calls them while holding its state lock, so they must not call back into
/// the scheduler; doing so deadlocks. `execute` runs without any scheduler
/// lock held and may use the scheduler freely. Returning `Err` (or panicking)
/// from it is treated as a failed attempt.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use task_scheduler::core::{ExecutionContext, ExecutionError, Task, TaskExecutor};
///
/// struct BackupExecutor;
///
/// #[async_trait]
/// impl TaskExecutor for BackupExecutor {
///     async fn execute(
///         &self,
///         task: Task,
///         ctx: ExecutionContext,
///     ) -> Result<serde_json::Value, ExecutionError> {
///         ctx.report_progress(50);
///         Ok(serde_json::json!({ "backed_up": task.payload }))
///     }
/// }
/// ```
#[async_trait]
pub trait TaskExecutor: Send + Sync + 'static {
    /// Feasibility check; no side effects. Called under the scheduler lock.
    fn can_execute(&self, _task: &Task) -> bool {
        true
    }

    /// Run one attempt of the task.
    async fn execute(
        &self,
        task: Task,
        ctx: ExecutionContext,
    ) -> Result<serde_json::Value, ExecutionError>;

    /// Expected wall time of one attempt. Called under the scheduler lock.
    fn estimated_duration(&self, _task: &Task) -> Duration {
        Duration::ZERO
    }

    /// Resources one attempt will hold while running. Called under the
    /// scheduler lock.
    fn resource_requirements(&self, _task: &Task) -> ResourceRequirements {
        ResourceRequirements::default()
    }
}

/// Receiver for executor-reported progress.
pub(crate) trait ProgressSink: Send + Sync {
    /// Record progress for `task_id` if `attempt` is still the running one.
    fn report(&self, task_id: &str, attempt: u32, progress: u8);
}

/// Per-attempt handle passed to [`TaskExecutor::execute`].
#[derive(Clone)]
pub struct ExecutionContext {
    task_id: TaskId,
    attempt: u32,
    cancellation: CancellationToken,
    progress: Option<Weak<dyn ProgressSink>>,
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("task_id", &self.task_id)
            .field("attempt", &self.attempt)
            .field("cancelled", &self.cancellation.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl ExecutionContext {
    pub(crate) fn new(
        task_id: TaskId,
        attempt: u32,
        cancellation: CancellationToken,
        progress: Weak<dyn ProgressSink>,
    ) -> Self {
        Self {
            task_id,
            attempt,
            cancellation,
            progress: Some(progress),
        }
    }

    /// Context that is not attached to any scheduler. Useful for calling an
    /// executor directly in tests.
    #[must_use]
    pub fn detached(task_id: impl Into<TaskId>) -> Self {
        Self {
            task_id: task_id.into(),
            attempt: 1,
            cancellation: CancellationToken::new(),
            progress: None,
        }
    }

    /// Identifier of the task being executed.
    #[must_use]
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// 1-based attempt number.
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Token fired when the task is cancelled or the scheduler shuts down.
    #[must_use]
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Shortcut for `cancellation().is_cancelled()`.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Report progress (clamped to 100). Ignored once the attempt is no longer running.
    pub fn report_progress(&self, progress: u8) {
        if let Some(sink) = self.progress.as_ref().and_then(Weak::upgrade) {
            sink.report(&self.task_id, self.attempt, progress.min(100));
        }
    }
}

/// Maps task types to executors.
#[derive(Default, Clone)]
pub struct ExecutorRegistry {
    executors: HashMap<String, Arc<dyn TaskExecutor>>,
}

impl ExecutorRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install or replace the executor for `task_type`, returning the previous one.
    pub fn register(
        &mut self,
        task_type: impl Into<String>,
        executor: Arc<dyn TaskExecutor>,
    ) -> Option<Arc<dyn TaskExecutor>> {
        self.executors.insert(task_type.into(), executor)
    }

    /// Executor for `task_type`.
    #[must_use]
    pub fn get(&self, task_type: &str) -> Option<Arc<dyn TaskExecutor>> {
        self.executors.get(task_type).cloned()
    }

}
