//! Task lifecycle state machine.
//!
//! Every status change the scheduler makes goes through [`TaskStatus::transition`],
//! so an illegal move shows up as an error instead of a silently corrupted record.
//!
//! ```text
//!            Enqueue           Admit            Succeed
//!  Pending ──────────> Queued ───────> Running ─────────> Completed
//!     ^                  │                │ │
//!     │ Retry            │ Expire         │ └── Fail ───> Failed
//!     └──────────────────┼────────────────┘
//!                        v
//!                     Expired
//!
//!  Cancel: Pending | Queued | Running ──> Cancelled
//! ```

use serde::{Deserialize, Serialize};

use crate::core::error::SchedulerError;

/// Status of a task in the scheduler lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, not yet queued (also the transient state between retries).
    Pending,
    /// Waiting in the priority queue for admission.
    Queued,
    /// Admitted and dispatched to an executor.
    Running,
    /// Finished successfully.
    Completed,
    /// Failed after exhausting its retries.
    Failed,
    /// Cancelled by a caller or by shutdown.
    Cancelled,
    /// TTL elapsed before the task was admitted.
    Expired,
}

/// Lifecycle events that drive status transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskEvent {
    /// Validated and placed in the queue.
    Enqueue,
    /// Picked by the admission tick.
    Admit,
    /// Executor settled successfully.
    Succeed,
    /// Executor failed and retries remain.
    Retry,
    /// Executor failed with no retries left.
    Fail,
    /// Cancelled externally.
    Cancel,
    /// TTL elapsed while queued.
    Expire,
}

impl TaskStatus {
    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Cancelled | Self::Expired
        )
    }

    /// Apply `event` and return the next status.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidTransition`] when `event` is not legal
    /// from `self`.
    pub const fn transition(self, event: TaskEvent) -> Result<Self, SchedulerError> {
        let next = match (self, event) {
            (Self::Pending, TaskEvent::Enqueue) => Self::Queued,
            (Self::Queued, TaskEvent::Admit) => Self::Running,
            (Self::Queued, TaskEvent::Expire) => Self::Expired,
            (Self::Running, TaskEvent::Succeed) => Self::Completed,
            (Self::Running, TaskEvent::Retry) => Self::Pending,
            (Self::Running, TaskEvent::Fail) => Self::Failed,
            (Self::Pending | Self::Queued | Self::Running, TaskEvent::Cancel) => Self::Cancelled,
            (from, event) => return Err(SchedulerError::InvalidTransition { from, event }),
        };
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let s = TaskStatus::Pending.transition(TaskEvent::Enqueue).unwrap();
        let s = s.transition(TaskEvent::Admit).unwrap();
        assert_eq!(s.transition(TaskEvent::Succeed).unwrap(), TaskStatus::Completed);
    }

    #[test]
    fn test_retry_returns_to_pending() {
        let s = TaskStatus::Running.transition(TaskEvent::Retry).unwrap();
        assert_eq!(s, TaskStatus::Pending);
        assert_eq!(s.transition(TaskEvent::Enqueue).unwrap(), TaskStatus::Queued);
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        let events = [
            TaskEvent::Enqueue,
            TaskEvent::Admit,
            TaskEvent::Succeed,
            TaskEvent::Retry,
            TaskEvent::Fail,
            TaskEvent::Cancel,
            TaskEvent::Expire,
        ];
        for status in [
            TaskStatus::Completed,
            TaskStatus::Failed,
            TaskStatus::Cancelled,
            TaskStatus::Expired,
        ] {
            assert!(status.is_terminal());
            for event in events {
                assert!(status.transition(event).is_err(), "{status:?} accepted {event:?}");
            }
        }
    }

    #[test]
    fn test_running_cannot_expire() {
        let err = TaskStatus::Running.transition(TaskEvent::Expire).unwrap_err();
        assert_eq!(
            err,
            SchedulerError::InvalidTransition {
                from: TaskStatus::Running,
                event: TaskEvent::Expire
            }
        );
    }
}
