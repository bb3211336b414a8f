//! Tests for error types

use std::time::Duration;

use task_scheduler::core::{ExecutionError, SchedulerError, TaskEvent, TaskStatus};

#[test]
fn test_queue_full_error() {
    let err = SchedulerError::QueueFull { capacity: 2 };
    assert_eq!(format!("{err}"), "queue full: 2 tasks queued");
}

#[test]
fn test_validation_error() {
    let err = SchedulerError::Validation("payload is required".to_string());
    assert_eq!(format!("{err}"), "validation error: payload is required");
}

#[test]
fn test_invalid_transition_error() {
    let err = TaskStatus::Completed.transition(TaskEvent::Admit).unwrap_err();
    assert_eq!(
        err,
        SchedulerError::InvalidTransition {
            from: TaskStatus::Completed,
            event: TaskEvent::Admit,
        }
    );
    assert_eq!(format!("{err}"), "invalid transition: Admit from Completed");
}

#[test]
fn test_shut_down_error() {
    assert_eq!(format!("{}", SchedulerError::ShutDown), "scheduler is shut down");
}

#[test]
fn test_execution_errors() {
    assert_eq!(
        ExecutionError::failed("disk full").to_string(),
        "execution failed: disk full"
    );
    assert_eq!(
        ExecutionError::TimedOut(Duration::from_millis(250)).to_string(),
        "execution timed out after 250ms"
    );
    assert_eq!(
        ExecutionError::Panicked("oops".into()).to_string(),
        "executor panicked: oops"
    );
    assert_eq!(ExecutionError::Cancelled.to_string(), "execution cancelled");
}
