//! Priority scheduler with resource-aware admission control.
//!
//! All mutable state (store, queue, running set, resource tracker) sits behind a
//! single `parking_lot::Mutex`. It is held only while state changes, never while
//! an executor runs. The admission and cleanup ticks are additionally serialized
//! by a tick guard so they never overlap each other or themselves. Executions run
//! concurrently on the spawner and funnel their settlement back through the same
//! state lock.
//!
//! Events are published to the notifier's outbox while the state lock is held,
//! so their order matches the order of the state changes, and delivered after
//! the lock is released.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::SchedulerConfig;
use crate::core::error::{ExecutionError, SchedulerError};
use crate::core::events::{EventListener, EventNotifier, SchedulerEvent};
use crate::core::executor::{ExecutionContext, ExecutorRegistry, ProgressSink, TaskExecutor};
use crate::core::lifecycle::{TaskEvent, TaskStatus};
use crate::core::resources::{ResourceRequirements, ResourceTracker, ResourceUsage};
use crate::core::spawn::Spawn;
use crate::core::stats::{mean_ms, throughput_per_hour, TaskManagerStats};
use crate::core::task::{Priority, Task, TaskId, TaskSpec};
use crate::infra::{Bucket, PriorityQueue, TaskFilter, TaskStore};
use crate::util::clock::{Clock, SystemClock};
use crate::util::ids::generate_task_id;

type Outcome = Result<serde_json::Value, ExecutionError>;

/// Bookkeeping for an admitted attempt.
struct RunningTask {
    attempt: u32,
    requirements: ResourceRequirements,
    estimated: Duration,
    cancel: CancellationToken,
}

/// Everything guarded by the single writer lock.
struct SchedulerState {
    store: TaskStore,
    queue: PriorityQueue,
    running: HashMap<TaskId, RunningTask>,
    resources: ResourceTracker,
    total_executed: u64,
    shut_down: bool,
}

/// An admitted attempt waiting to be handed to the spawner.
struct Dispatch {
    task: Task,
    executor: Arc<dyn TaskExecutor>,
    ctx: ExecutionContext,
}

/// State shared between the scheduler handle, its loops, and in-flight executions.
struct Shared {
    config: SchedulerConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<SchedulerState>,
    executors: RwLock<ExecutorRegistry>,
    notifier: EventNotifier,
    tick_guard: Mutex<()>,
    shutdown: CancellationToken,
    started: AtomicBool,
    created_at_ms: u64,
    this: Weak<Self>,
}

/// Priority task scheduler.
///
/// Cheap to clone; clones share the same state.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use task_scheduler::config::SchedulerConfig;
/// use task_scheduler::core::{Priority, Scheduler, TaskSpec};
/// use task_scheduler::runtime::TokioSpawner;
///
/// let scheduler = Scheduler::new(SchedulerConfig::default(), TokioSpawner::current()?)?;
/// scheduler.register_executor("backup", Arc::new(BackupExecutor));
/// scheduler.start();
///
/// let task = scheduler.submit(TaskSpec::new("backup", Priority::High, payload))?;
/// let status = scheduler.get_status(&task.id);
/// ```
pub struct Scheduler<S> {
    shared: Arc<Shared>,
    spawner: S,
}

impl<S: Clone> Clone for Scheduler<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            spawner: self.spawner.clone(),
        }
    }
}

impl<S> Scheduler<S>
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    /// Create a scheduler driven by the system clock.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::Config`] when `config` fails validation.
    pub fn new(config: SchedulerConfig, spawner: S) -> Result<Self, SchedulerError> {
        Self::with_clock(config, Arc::new(SystemClock), spawner)
    }

    /// Create a scheduler with an injected clock.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::Config`] when `config` fails validation.
    pub fn with_clock(
        config: SchedulerConfig,
        clock: Arc<dyn Clock>,
        spawner: S,
    ) -> Result<Self, SchedulerError> {
        config.validate().map_err(SchedulerError::Config)?;
        let created_at_ms = clock.now_ms();
        let state = SchedulerState {
            store: TaskStore::new(),
            queue: PriorityQueue::new(config.limits.max_queue_size),
            running: HashMap::new(),
            resources: ResourceTracker::new(config.limits.clone()),
            total_executed: 0,
            shut_down: false,
        };
        let notifier = EventNotifier::new(config.event_capacity);
        let shared = Arc::new_cyclic(|this| Shared {
            config,
            clock,
            state: Mutex::new(state),
            executors: RwLock::new(ExecutorRegistry::new()),
            notifier,
            tick_guard: Mutex::new(()),
            shutdown: CancellationToken::new(),
            started: AtomicBool::new(false),
            created_at_ms,
            this: this.clone(),
        });
        Ok(Self { shared, spawner })
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }

    /// Install or replace the executor for `task_type`.
    pub fn register_executor(&self, task_type: impl Into<String>, executor: Arc<dyn TaskExecutor>) {
        let task_type = task_type.into();
        let replaced = self
            .shared
            .executors
            .write()
            .register(task_type.clone(), executor)
            .is_some();
        info!(task_type = %task_type, replaced, "executor registered");
        self.shared
            .notifier
            .emit(SchedulerEvent::ExecutorRegistered { task_type });
    }

    /// Register a synchronous event listener.
    pub fn add_listener(&self, listener: Arc<dyn EventListener>) {
        self.shared.notifier.add_listener(listener);
    }

    /// Subscribe to events emitted from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.shared.notifier.subscribe()
    }

    /// Token cancelled when the scheduler shuts down.
    #[must_use]
    pub fn shutdown_signal(&self) -> CancellationToken {
        self.shared.shutdown.child_token()
    }

    /// Run `fut` on the scheduler's spawner, e.g. a sampler loop.
    pub fn spawn_background<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.spawner.spawn(fut);
    }

    /// Whether [`Scheduler::shutdown`] has run.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shared.state.lock().shut_down
    }

    /// Validate and enqueue a new task.
    ///
    /// # Errors
    ///
    /// - [`SchedulerError::Validation`]: missing type or payload, duplicate id,
    ///   no executor for the type, or the executor refuses the task.
    /// - [`SchedulerError::QueueFull`]: the queue is at `max_queue_size`.
    /// - [`SchedulerError::ShutDown`]: the scheduler no longer accepts work.
    ///
    /// A rejected submission leaves the scheduler unchanged.
    pub fn submit(&self, spec: TaskSpec) -> Result<Task, SchedulerError> {
        if spec.task_type.trim().is_empty() {
            return Err(SchedulerError::Validation("task_type is required".into()));
        }
        if spec.payload.is_null() {
            return Err(SchedulerError::Validation("payload is required".into()));
        }

        let shared = &self.shared;
        let now = shared.clock.now_ms();
        let id = spec
            .id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(generate_task_id);
        let mut task = Task::from_spec(id, spec, shared.config.default_max_retries, now);

        let executor = shared.executors.read().get(&task.task_type).ok_or_else(|| {
            SchedulerError::Validation(format!(
                "no executor registered for task type `{}`",
                task.task_type
            ))
        })?;
        if !executor.can_execute(&task) {
            return Err(SchedulerError::Validation(format!(
                "executor for `{}` cannot run task {}",
                task.task_type, task.id
            )));
        }

        {
            let mut state = shared.state.lock();
            if state.shut_down {
                return Err(SchedulerError::ShutDown);
            }
            if state.store.contains(&task.id) {
                return Err(SchedulerError::Validation(format!(
                    "task id `{}` already exists",
                    task.id
                )));
            }
            if state.queue.is_full() {
                warn!(
                    task_id = %task.id,
                    depth = state.queue.len(),
                    "task rejected: queue full"
                );
                return Err(SchedulerError::QueueFull {
                    capacity: state.queue.max_depth(),
                });
            }

            let wait = shared.estimate_wait(&state, task.priority);
            task.estimated_start_ms = now.saturating_add(duration_ms(wait));
            let submitted = task.clone();
            task.status = task.status.transition(TaskEvent::Enqueue)?;
            state.queue.enqueue(task.id.clone(), task.priority)?;
            state.store.insert(task.clone());
            shared.notifier.publish([
                SchedulerEvent::TaskSubmitted(submitted),
                SchedulerEvent::TaskQueued(task.clone()),
            ]);
        }

        info!(
            task_id = %task.id,
            task_type = %task.task_type,
            priority = ?task.priority,
            "task queued"
        );
        shared.notifier.flush();
        Ok(task)
    }

    /// Snapshot of a task record.
    #[must_use]
    pub fn get_status(&self, id: &str) -> Option<Task> {
        self.shared.state.lock().store.get(id).cloned()
    }

    /// Records matching `filter`, newest first.
    #[must_use]
    pub fn list_tasks(&self, filter: &TaskFilter) -> Vec<Task> {
        self.shared.state.lock().store.list(filter)
    }

    /// Queued task ids, head to tail.
    #[must_use]
    pub fn queued_ids(&self) -> Vec<TaskId> {
        self.shared.state.lock().queue.ids()
    }

    /// Ids of running tasks, sorted.
    #[must_use]
    pub fn running_ids(&self) -> Vec<TaskId> {
        let mut ids: Vec<_> = self.shared.state.lock().running.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Cancel a pending, queued, or running task.
    ///
    /// Returns `false` for unknown ids and tasks already in a terminal status.
    /// A running attempt is not interrupted: its cancellation token fires and
    /// whatever it eventually returns is discarded.
    pub fn cancel(&self, id: &str) -> bool {
        let shared = &self.shared;
        let cancelled = {
            let mut state = shared.state.lock();
            let now = shared.clock.now_ms();
            let task = shared.cancel_locked(&mut state, id, now);
            if let Some(task) = &task {
                shared
                    .notifier
                    .publish([SchedulerEvent::TaskCancelled(task.clone())]);
            }
            task.is_some()
        };
        shared.notifier.flush();
        if cancelled {
            info!(task_id = %id, "task cancelled");
        } else {
            debug!(task_id = %id, "cancel rejected: unknown or terminal task");
        }
        cancelled
    }

    /// Replace the reported resource usage snapshot.
    pub fn update_resource_usage(&self, memory: f64, cpu: f64) {
        {
            let mut state = self.shared.state.lock();
            let now = self.shared.clock.now_ms();
            let usage = state.resources.update(memory, cpu, now);
            self.shared
                .notifier
                .publish([SchedulerEvent::ResourceUsageUpdated(usage)]);
        }
        debug!(memory, cpu, "resource usage updated");
        self.shared.notifier.flush();
    }

    /// Last reported resource usage.
    #[must_use]
    pub fn resource_usage(&self) -> ResourceUsage {
        self.shared.state.lock().resources.usage()
    }

    /// Remove terminal records older than `max_age`. Queued and running tasks
    /// are never touched. Waits for an in-progress tick to finish.
    pub fn cleanup(&self, max_age: Duration) -> usize {
        let guard = self.shared.tick_guard.lock();
        let removed = self.shared.cleanup_locked(max_age);
        drop(guard);
        self.shared.notifier.flush();
        removed
    }

    /// One cleanup tick using the configured retention. Skipped when another
    /// tick is in progress.
    pub fn run_cleanup_tick(&self) -> Option<usize> {
        let Some(guard) = self.shared.tick_guard.try_lock() else {
            debug!("cleanup tick skipped: another tick in progress");
            return None;
        };
        let removed = self.shared.cleanup_locked(self.shared.config.retention());
        drop(guard);
        self.shared.notifier.flush();
        Some(removed)
    }

    /// One admission tick: expire queued tasks past their TTL, then admit up to
    /// `admissions_per_tick` tasks that pass the concurrency and resource gates.
    /// Returns the number of tasks dispatched.
    pub fn run_admission_tick(&self) -> usize {
        let Some(guard) = self.shared.tick_guard.try_lock() else {
            debug!("admission tick skipped: another tick in progress");
            return 0;
        };
        let dispatches = self.shared.admit_locked();
        drop(guard);

        self.shared.notifier.flush();
        let admitted = dispatches.len();
        for dispatch in dispatches {
            self.dispatch(dispatch);
        }
        admitted
    }

    /// Derived statistics.
    #[must_use]
    pub fn stats(&self) -> TaskManagerStats {
        let shared = &self.shared;
        let state = shared.state.lock();
        let now = shared.clock.now_ms();
        let uptime_ms = now.saturating_sub(shared.created_at_ms);
        let queued_waits = state
            .queue
            .iter()
            .filter_map(|(id, _)| state.store.get(id))
            .map(|t| now.saturating_sub(t.submitted_at_ms));
        let run_times = state.store.bucket(Bucket::Completed).map(|t| {
            let start = t.started_at_ms.unwrap_or(t.submitted_at_ms);
            t.ended_at_ms.unwrap_or(start).saturating_sub(start)
        });

        TaskManagerStats {
            active_tasks: state.running.len(),
            queued_tasks: state.queue.len(),
            completed_tasks: state.store.bucket_len(Bucket::Completed),
            failed_tasks: state.store.bucket_len(Bucket::Failed),
            cancelled_tasks: state.store.count_status(TaskStatus::Cancelled),
            expired_tasks: state.store.count_status(TaskStatus::Expired),
            total_executed: state.total_executed,
            throughput_per_hour: throughput_per_hour(state.total_executed, uptime_ms),
            average_execution_time_ms: mean_ms(run_times),
            queue_wait_time_ms: mean_ms(queued_waits),
            uptime_ms,
            resource_usage: state.resources.usage(),
            reserved_resources: state.resources.reserved(),
        }
    }

    /// Spawn the periodic admission and cleanup loops. Idempotent.
    pub fn start(&self) {
        if self.shared.started.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(
            admission_ms = self.shared.config.admission_interval_ms,
            cleanup_ms = self.shared.config.cleanup_interval_ms,
            "scheduler loops starting"
        );

        let admission = self.clone();
        let period = self.shared.config.admission_interval();
        self.spawner.spawn(async move {
            admission
                .run_periodic("admission", period, |s| {
                    s.run_admission_tick();
                })
                .await;
        });

        let cleanup = self.clone();
        let period = self.shared.config.cleanup_interval();
        self.spawner.spawn(async move {
            cleanup
                .run_periodic("cleanup", period, |s| {
                    s.run_cleanup_tick();
                })
                .await;
        });
    }

    async fn run_periodic(&self, name: &'static str, period: Duration, tick: impl Fn(&Self)) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                () = self.shared.shutdown.cancelled() => break,
                _ = interval.tick() => {
                    if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(|| tick(self))) {
                        let message = format!("{name} tick panicked: {}", panic_message(&*panic));
                        error!(tick = name, "{message}");
                        self.shared.notifier.emit(SchedulerEvent::Error { message });
                    }
                }
            }
        }
        debug!(tick = name, "scheduler loop stopped");
    }

    /// Stop both loops and cancel every running and queued task.
    pub fn shutdown(&self) {
        let shared = &self.shared;
        let cancelled = {
            let mut state = shared.state.lock();
            if state.shut_down {
                return;
            }
            state.shut_down = true;
            let now = shared.clock.now_ms();
            let mut ids: Vec<TaskId> = state.running.keys().cloned().collect();
            ids.sort();
            ids.extend(state.queue.ids());
            let cancelled: Vec<_> = ids
                .iter()
                .filter_map(|id| shared.cancel_locked(&mut state, id, now))
                .collect();
            let count = cancelled.len();
            shared.notifier.publish(
                cancelled
                    .into_iter()
                    .map(SchedulerEvent::TaskCancelled)
                    .chain([SchedulerEvent::Shutdown]),
            );
            count
        };
        shared.shutdown.cancel();
        info!(cancelled, "scheduler shut down");
        shared.notifier.flush();
    }

    fn dispatch(&self, dispatch: Dispatch) {
        let shared = Arc::clone(&self.shared);
        let timeout = shared.config.execution_timeout();
        let Dispatch {
            task,
            executor,
            ctx,
        } = dispatch;
        let id = task.id.clone();
        let attempt = ctx.attempt();

        self.spawner.spawn(async move {
            debug!(task_id = %id, attempt, "executing task");
            let run = AssertUnwindSafe(executor.execute(task, ctx)).catch_unwind();
            let outcome = match timeout {
                Some(limit) => match tokio::time::timeout(limit, run).await {
                    Ok(result) => flatten_panic(result),
                    Err(_) => Err(ExecutionError::TimedOut(limit)),
                },
                None => flatten_panic(run.await),
            };
            shared.settle(&id, attempt, outcome);
        });
    }
}

impl Shared {
    /// Advisory wait: queued work at or above `priority` plus the remaining
    /// share of running work.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn estimate_wait(&self, state: &SchedulerState, priority: Priority) -> Duration {
        let executors = self.executors.read();
        let queued: Duration = state
            .queue
            .iter()
            .filter(|(_, p)| *p >= priority)
            .filter_map(|(id, _)| state.store.get(id))
            .filter_map(|t| executors.get(&t.task_type).map(|e| e.estimated_duration(t)))
            .sum();
        let running: Duration = state
            .running
            .iter()
            .map(|(id, r)| {
                let progress = state.store.get(id).map_or(0, |t| t.progress);
                let remaining = 1.0 - f64::from(progress) / 100.0;
                Duration::from_millis((duration_ms(r.estimated) as f64 * remaining) as u64)
            })
            .sum();
        queued + running
    }

    /// Runs under the state lock and publishes its events before releasing it.
    fn admit_locked(&self) -> Vec<Dispatch> {
        let mut state = self.state.lock();
        if state.shut_down {
            return Vec::new();
        }
        let now = self.clock.now_ms();
        let mut events = self.expire_locked(&mut state, now);
        let mut dispatches = Vec::new();
        let max_running = self.config.limits.max_concurrent_tasks;

        for _ in 0..self.config.admissions_per_tick {
            if state.running.len() >= max_running {
                debug!(running = state.running.len(), "admission gated by concurrency limit");
                break;
            }
            match self.admit_next(&mut state, now) {
                Ok(Some(dispatch)) => {
                    events.push(SchedulerEvent::TaskStarted(dispatch.task.clone()));
                    dispatches.push(dispatch);
                }
                Ok(None) => break,
                Err(e) => {
                    error!(error = %e, "admission tick failed");
                    events.push(SchedulerEvent::Error {
                        message: format!("admission tick failed: {e}"),
                    });
                    break;
                }
            }
        }
        self.notifier.publish(events);
        dispatches
    }

    /// Admit the first queued task that its executor accepts and whose
    /// requirements fit the resource budget.
    fn admit_next(
        &self,
        state: &mut SchedulerState,
        now: u64,
    ) -> Result<Option<Dispatch>, SchedulerError> {
        let candidate = {
            let executors = self.executors.read();
            state.queue.iter().find_map(|(id, _)| {
                let task = state.store.get(id)?;
                let executor = executors.get(&task.task_type)?;
                if !executor.can_execute(task) {
                    return None;
                }
                let requirements = executor.resource_requirements(task);
                if !state.resources.fits(&requirements) {
                    return None;
                }
                let estimated = executor.estimated_duration(task);
                Some((task.id.clone(), executor, requirements, estimated))
            })
        };
        let Some((id, executor, requirements, estimated)) = candidate else {
            return Ok(None);
        };

        let task = state
            .store
            .get_mut(&id)
            .ok_or_else(|| SchedulerError::NotFound(id.clone()))?;
        task.status = task.status.transition(TaskEvent::Admit)?;
        task.started_at_ms = Some(now);
        task.progress = 0;
        task.attempts += 1;
        let attempt = task.attempts;
        let snapshot = task.clone();

        state.queue.remove(&id);
        state.resources.reserve(&requirements);
        let cancel = self.shutdown.child_token();
        state.running.insert(
            id.clone(),
            RunningTask {
                attempt,
                requirements,
                estimated,
                cancel: cancel.clone(),
            },
        );

        info!(task_id = %id, attempt, "task started");
        let sink: Weak<dyn ProgressSink> = self.this.clone();
        Ok(Some(Dispatch {
            task: snapshot,
            executor,
            ctx: ExecutionContext::new(id, attempt, cancel, sink),
        }))
    }

    fn expire_locked(&self, state: &mut SchedulerState, now: u64) -> Vec<SchedulerEvent> {
        let expired: Vec<TaskId> = state
            .queue
            .iter()
            .filter(|(id, _)| state.store.get(id).is_some_and(|t| t.ttl_elapsed(now)))
            .map(|(id, _)| id.to_owned())
            .collect();

        let mut events = Vec::with_capacity(expired.len());
        for id in expired {
            state.queue.remove(&id);
            let Some(task) = state.store.get_mut(&id) else {
                continue;
            };
            match task.status.transition(TaskEvent::Expire) {
                Ok(next) => {
                    task.status = next;
                    task.ended_at_ms = Some(now);
                    let snapshot = task.clone();
                    state.store.sync_bucket(&id);
                    warn!(task_id = %id, "task expired before admission");
                    events.push(SchedulerEvent::TaskExpired(snapshot));
                }
                Err(e) => events.push(SchedulerEvent::Error {
                    message: format!("failed to expire task {id}: {e}"),
                }),
            }
        }
        events
    }

    fn cancel_locked(&self, state: &mut SchedulerState, id: &str, now: u64) -> Option<Task> {
        let status = state.store.get(id)?.status;
        let next = status.transition(TaskEvent::Cancel).ok()?;
        match status {
            TaskStatus::Running => {
                if let Some(running) = state.running.remove(id) {
                    running.cancel.cancel();
                    state.resources.release(&running.requirements);
                }
            }
            _ => {
                state.queue.remove(id);
            }
        }
        let task = state.store.get_mut(id)?;
        task.status = next;
        task.ended_at_ms = Some(now);
        let snapshot = task.clone();
        state.store.sync_bucket(id);
        Some(snapshot)
    }

    fn cleanup_locked(&self, max_age: Duration) -> usize {
        let mut state = self.state.lock();
        let now = self.clock.now_ms();
        let cutoff = now.saturating_sub(duration_ms(max_age));
        let removed = state.store.prune_terminal_before(cutoff).len();
        if removed > 0 {
            info!(removed, "pruned terminal task records");
        }
        self.notifier
            .publish([SchedulerEvent::CleanupCompleted { removed }]);
        removed
    }

    /// Apply an executor outcome. Outcomes for tasks that are no longer running
    /// (cancelled, or superseded by a later attempt) are dropped.
    fn settle(&self, id: &str, attempt: u32, outcome: Outcome) {
        {
            let mut state = self.state.lock();
            let current = state.running.get(id).map(|r| r.attempt);
            if current != Some(attempt) {
                debug!(task_id = %id, attempt, "discarding settlement of untracked attempt");
                return;
            }
            if let Some(running) = state.running.remove(id) {
                state.resources.release(&running.requirements);
            }
            let now = self.clock.now_ms();
            let event = apply_outcome(&mut state, id, outcome, now).unwrap_or_else(|e| {
                error!(task_id = %id, error = %e, "failed to settle task");
                SchedulerEvent::Error {
                    message: format!("failed to settle task {id}: {e}"),
                }
            });
            self.notifier.publish([event]);
        }
        self.notifier.flush();
    }
}

impl ProgressSink for Shared {
    fn report(&self, task_id: &str, attempt: u32, progress: u8) {
        {
            let mut state = self.state.lock();
            if state.running.get(task_id).map(|r| r.attempt) != Some(attempt) {
                return;
            }
            let Some(task) = state.store.get_mut(task_id) else {
                return;
            };
            task.progress = progress;
            self.notifier.publish([SchedulerEvent::TaskProgress {
                task_id: task_id.to_owned(),
                progress,
            }]);
        }
        self.notifier.flush();
    }
}

fn apply_outcome(
    state: &mut SchedulerState,
    id: &str,
    outcome: Outcome,
    now: u64,
) -> Result<SchedulerEvent, SchedulerError> {
    let task = state
        .store
        .get_mut(id)
        .ok_or_else(|| SchedulerError::NotFound(id.to_owned()))?;

    let event = match outcome {
        Ok(result) => {
            task.status = task.status.transition(TaskEvent::Succeed)?;
            task.progress = 100;
            task.result = Some(result);
            task.error = None;
            task.ended_at_ms = Some(now);
            state.total_executed += 1;
            info!(task_id = %id, attempts = task.attempts, "task completed");
            SchedulerEvent::TaskCompleted(task.clone())
        }
        Err(failure) => {
            task.error = Some(failure.to_string());
            task.result = None;
            task.ended_at_ms = Some(now);
            if task.retry_count < task.max_retries {
                task.retry_count += 1;
                task.status = task
                    .status
                    .transition(TaskEvent::Retry)?
                    .transition(TaskEvent::Enqueue)?;
                task.progress = 0;
                let priority = task.priority;
                warn!(
                    task_id = %id,
                    retry = task.retry_count,
                    max_retries = task.max_retries,
                    error = %failure,
                    "task failed, retrying"
                );
                let snapshot = task.clone();
                state.queue.requeue(id.to_owned(), priority);
                SchedulerEvent::TaskRetry(snapshot)
            } else {
                task.status = task.status.transition(TaskEvent::Fail)?;
                error!(
                    task_id = %id,
                    attempts = task.attempts,
                    error = %failure,
                    "task failed permanently"
                );
                SchedulerEvent::TaskFailed(task.clone())
            }
        }
    };
    state.store.sync_bucket(id);
    Ok(event)
}

fn flatten_panic(result: Result<Outcome, Box<dyn Any + Send>>) -> Outcome {
    result.unwrap_or_else(|panic| Err(ExecutionError::Panicked(panic_message(&*panic))))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_owned())
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
