//! Shared fixtures for scheduler integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use task_scheduler::config::SchedulerConfig;
use task_scheduler::core::{
    ExecutionContext, ExecutionError, ResourceLimits, ResourceRequirements, Scheduler,
    SchedulerEvent, Task, TaskExecutor,
};
use task_scheduler::runtime::TokioSpawner;
use task_scheduler::util::{init_tracing_with_default, ManualClock};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, Notify};

/// What a [`TestExecutor`] does when executed.
#[derive(Clone, Copy, Debug)]
pub enum Behavior {
    /// Resolve immediately with `{"id": <task id>}`.
    Succeed,
    /// Resolve immediately with an error.
    Fail,
    /// Panic inside `execute`.
    Panic,
    /// Wait until cancelled.
    Hang,
    /// Report 40% progress, then wait until cancelled.
    ProgressThenHang,
    /// Sleep, then succeed.
    Sleep(Duration),
}

/// Observations shared between a test and its executor.
#[derive(Clone, Default)]
pub struct Recorder {
    pub order: Arc<Mutex<Vec<String>>>,
    pub attempts: Arc<AtomicU32>,
    pub cancel_seen: Arc<Notify>,
}

impl Recorder {
    pub fn order(&self) -> Vec<String> {
        self.order.lock().clone()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

/// Configurable executor for scheduler tests.
pub struct TestExecutor {
    pub behavior: Behavior,
    pub recorder: Recorder,
    pub requirements: ResourceRequirements,
    pub estimate: Duration,
}

impl TestExecutor {
    pub fn new(behavior: Behavior, recorder: &Recorder) -> Self {
        Self {
            behavior,
            recorder: recorder.clone(),
            requirements: ResourceRequirements::default(),
            estimate: Duration::ZERO,
        }
    }

    pub fn with_requirements(mut self, memory: f64, cpu: f64) -> Self {
        self.requirements = ResourceRequirements::new(memory, cpu);
        self
    }

    pub fn with_estimate(mut self, estimate: Duration) -> Self {
        self.estimate = estimate;
        self
    }

    pub fn arc(self) -> Arc<dyn TaskExecutor> {
        Arc::new(self)
    }
}

#[async_trait]
impl TaskExecutor for TestExecutor {
    fn can_execute(&self, task: &Task) -> bool {
        task.payload.get("reject").is_none()
    }

    async fn execute(
        &self,
        task: Task,
        ctx: ExecutionContext,
    ) -> Result<serde_json::Value, ExecutionError> {
        self.recorder.attempts.fetch_add(1, Ordering::SeqCst);
        self.recorder.order.lock().push(task.id.clone());
        match self.behavior {
            Behavior::Succeed => Ok(serde_json::json!({ "id": task.id })),
            Behavior::Fail => Err(ExecutionError::failed("boom")),
            Behavior::Panic => panic!("executor exploded"),
            Behavior::Hang => {
                ctx.cancellation().cancelled().await;
                self.recorder.cancel_seen.notify_one();
                Err(ExecutionError::Cancelled)
            }
            Behavior::ProgressThenHang => {
                ctx.report_progress(40);
                ctx.cancellation().cancelled().await;
                self.recorder.cancel_seen.notify_one();
                Err(ExecutionError::Cancelled)
            }
            Behavior::Sleep(d) => {
                tokio::time::sleep(d).await;
                Ok(serde_json::json!({ "slept_ms": d.as_millis() }))
            }
        }
    }

    fn estimated_duration(&self, _task: &Task) -> Duration {
        self.estimate
    }

    fn resource_requirements(&self, _task: &Task) -> ResourceRequirements {
        self.requirements
    }
}

pub fn config(max_concurrent_tasks: usize, max_queue_size: usize) -> SchedulerConfig {
    SchedulerConfig {
        limits: ResourceLimits {
            max_concurrent_tasks,
            max_queue_size,
            max_memory_usage: 100.0,
            max_cpu_usage: 100.0,
        },
        ..SchedulerConfig::default()
    }
}

/// Scheduler on the current tokio runtime driven by `clock`.
pub fn scheduler(config: SchedulerConfig, clock: &ManualClock) -> Scheduler<TokioSpawner> {
    init_tracing_with_default("task_scheduler=warn");
    Scheduler::with_clock(
        config,
        Arc::new(clock.clone()),
        TokioSpawner::current().expect("tokio runtime"),
    )
    .expect("valid config")
}

/// Wait for the next event named one of `names` about task `id`.
pub async fn wait_for_task_event(
    rx: &mut broadcast::Receiver<SchedulerEvent>,
    id: &str,
    names: &[&str],
) -> SchedulerEvent {
    wait_for(rx, |event| {
        names.contains(&event.name()) && event.task().is_some_and(|t| t.id == id)
    })
    .await
}

/// Wait for the next event matching `pred`.
pub async fn wait_for(
    rx: &mut broadcast::Receiver<SchedulerEvent>,
    pred: impl Fn(&SchedulerEvent) -> bool,
) -> SchedulerEvent {
    let next = async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => panic!("event channel closed"),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), next)
        .await
        .expect("timed out waiting for scheduler event")
}
