//! Tests for utility functions and shared value types

use std::time::Duration;

use serde_json::json;
use task_scheduler::core::{Priority, SchedulerEvent, TaskSpec, TaskStatus};
use task_scheduler::util::{
    generate_task_id, init_tracing, now_ms, Clock, ManualClock, SystemClock,
};

#[test]
fn test_priority_ordering() {
    assert!(Priority::Critical > Priority::High);
    assert!(Priority::High > Priority::Medium);
    assert!(Priority::Medium > Priority::Low);
    assert_eq!(Priority::default(), Priority::Medium);
}

#[test]
fn test_priority_serde_names() {
    assert_eq!(serde_json::to_value(Priority::Critical).unwrap(), json!("critical"));
    let parsed: Priority = serde_json::from_value(json!("low")).unwrap();
    assert_eq!(parsed, Priority::Low);
}

#[test]
fn test_task_id_generation() {
    let a = generate_task_id();
    let b = generate_task_id();
    assert_ne!(a, b);
    assert_eq!(a.len(), 36);
}

#[test]
fn test_manual_clock() {
    let clock = ManualClock::new(100);
    let shared = clock.clone();
    clock.advance(Duration::from_millis(50));
    assert_eq!(shared.now_ms(), 150);
    clock.set(10);
    assert_eq!(shared.now_ms(), 10);
}

#[test]
fn test_system_clock_tracks_wall_time() {
    let before = now_ms();
    let observed = SystemClock.now_ms();
    assert!(observed >= before);
}

#[test]
fn test_task_spec_builder() {
    let spec = TaskSpec::new("deploy", Priority::High, json!({ "service": "api" }))
        .with_id("t1")
        .with_tag("infrastructure")
        .with_metadata("owner", json!("ops"))
        .with_ttl_ms(1_000)
        .with_max_retries(5);

    assert_eq!(spec.id.as_deref(), Some("t1"));
    assert_eq!(spec.tags, vec!["infrastructure"]);
    assert_eq!(spec.metadata.get("owner"), Some(&json!("ops")));
    assert_eq!(spec.ttl_ms, Some(1_000));
    assert_eq!(spec.max_retries, Some(5));
}

#[test]
fn test_event_serialization() {
    let event = SchedulerEvent::CleanupCompleted { removed: 3 };
    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["event"], json!("cleanup-completed"));
    assert_eq!(value["removed"], json!(3));
    assert!(event.task().is_none());
}

#[test]
fn test_task_status_serialization() {
    let value = serde_json::to_value(TaskStatus::Running).unwrap();
    assert_eq!(value, json!("running"));
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
    assert!(tracing::dispatcher::has_been_set());
}
