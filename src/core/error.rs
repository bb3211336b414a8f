//! Error types for scheduler operations.

use std::time::Duration;

use thiserror::Error;

use crate::core::lifecycle::{TaskEvent, TaskStatus};

/// Errors returned synchronously by the scheduler API.
///
/// None of these variants leave a partial mutation behind: a rejected call
/// observes the same scheduler state it started with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// The request is malformed or no executor can run it. Not retryable.
    #[error("validation error: {0}")]
    Validation(String),
    /// Queue is at capacity. Transient; the caller may retry later.
    #[error("queue full: {capacity} tasks queued")]
    QueueFull {
        /// Configured maximum queue size.
        capacity: usize,
    },
    /// No task with the given identifier is known.
    #[error("task not found: {0}")]
    NotFound(String),
    /// A lifecycle event is not legal from the current status.
    #[error("invalid transition: {event:?} from {from:?}")]
    InvalidTransition {
        /// Status the task was in.
        from: TaskStatus,
        /// Event that was applied.
        event: TaskEvent,
    },
    /// The scheduler has been shut down and accepts no more work.
    #[error("scheduler is shut down")]
    ShutDown,
    /// Configuration could not be loaded or failed validation.
    #[error("config error: {0}")]
    Config(String),
}

/// Failure of a single execution attempt.
///
/// Execution failures drive the retry state machine and are recorded on the
/// task; they never propagate to the submitter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// The executor reported a failure.
    #[error("execution failed: {0}")]
    Failed(String),
    /// The supervising timeout fired before the executor settled.
    #[error("execution timed out after {0:?}")]
    TimedOut(Duration),
    /// The executor panicked.
    #[error("executor panicked: {0}")]
    Panicked(String),
    /// The executor observed its cancellation token and gave up.
    #[error("execution cancelled")]
    Cancelled,
}

impl ExecutionError {
    /// Convenience constructor for [`ExecutionError::Failed`].
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
