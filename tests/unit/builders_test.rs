//! Tests for builder modules

use std::sync::Arc;

use serde_json::json;
use task_scheduler::builders::SchedulerBuilder;
use task_scheduler::core::{InMemoryEventSink, Priority, TaskSpec};
use task_scheduler::runtime::TokioSpawner;
use task_scheduler::util::ManualClock;

use crate::common::{config, wait_for_task_event, Behavior, Recorder, TestExecutor};

#[tokio::test]
async fn test_scheduler_builder_defaults() {
    let builder = SchedulerBuilder::new(TokioSpawner::current().unwrap());
    assert_eq!(builder.config_ref().admission_interval_ms, 1_000);
    assert_eq!(builder.config_ref().limits.max_queue_size, 1_000);
}

#[tokio::test]
async fn test_scheduler_builder_installs_listeners_before_executors() {
    let sink = InMemoryEventSink::new(16);
    let recorder = Recorder::default();
    let scheduler = SchedulerBuilder::new(TokioSpawner::current().unwrap())
        .config(config(2, 8))
        .clock(Arc::new(ManualClock::new(0)))
        .listener(Arc::new(sink.clone()))
        .executor("a", TestExecutor::new(Behavior::Succeed, &recorder).arc())
        .executor("b", TestExecutor::new(Behavior::Succeed, &recorder).arc())
        .build()
        .unwrap();

    assert_eq!(
        sink.names(),
        vec!["executor-registered", "executor-registered"]
    );
    assert_eq!(scheduler.config().limits.max_queue_size, 8);
}

#[tokio::test]
async fn test_scheduler_builder_start_loops() {
    let mut cfg = config(1, 8);
    cfg.admission_interval_ms = 5;
    let recorder = Recorder::default();
    let scheduler = SchedulerBuilder::new(TokioSpawner::current().unwrap())
        .config(cfg)
        .executor("job", TestExecutor::new(Behavior::Succeed, &recorder).arc())
        .start_loops(true)
        .build()
        .unwrap();
    let mut rx = scheduler.subscribe();

    scheduler
        .submit(TaskSpec::new("job", Priority::Medium, json!({})).with_id("t"))
        .unwrap();
    wait_for_task_event(&mut rx, "t", &["task-completed"]).await;

    scheduler.shutdown();
}
