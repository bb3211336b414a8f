//! Lifecycle notifications and listener registry.
//!
//! Events fan out two ways: synchronous [`EventListener`]s registered on the
//! notifier, and a `tokio::sync::broadcast` channel for async subscribers.
//!
//! Delivery is a two-step outbox. The scheduler [`publish`](EventNotifier::publish)es
//! events while it still holds its state lock, so the outbox order is the order
//! of the state changes. It then [`flush`](EventNotifier::flush)es after the
//! lock is released. One caller at a time drains the outbox; a flush that finds
//! another drain in progress (another thread, or a listener re-entering the
//! scheduler) leaves its events to that drain. Listeners may therefore call back
//! into the scheduler and still observe events in state-change order.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::core::resources::ResourceUsage;
use crate::core::task::Task;

/// Notification emitted by the scheduler.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum SchedulerEvent {
    /// Task accepted by `submit`.
    TaskSubmitted(Task),
    /// Task placed in the priority queue.
    TaskQueued(Task),
    /// Task admitted and dispatched.
    TaskStarted(Task),
    /// Executor reported progress.
    TaskProgress {
        /// Task identifier.
        task_id: String,
        /// New progress value.
        progress: u8,
    },
    /// Task completed successfully.
    TaskCompleted(Task),
    /// Task failed terminally.
    TaskFailed(Task),
    /// Task failed and was re-queued.
    TaskRetry(Task),
    /// Task cancelled.
    TaskCancelled(Task),
    /// Task TTL elapsed while queued.
    TaskExpired(Task),
    /// Executor installed for a task type.
    ExecutorRegistered {
        /// Task type.
        task_type: String,
    },
    /// Cleanup pass finished.
    CleanupCompleted {
        /// Records removed.
        removed: usize,
    },
    /// Sampler reported new usage.
    ResourceUsageUpdated(ResourceUsage),
    /// Scheduler shut down.
    Shutdown,
    /// Non-fatal internal failure during a tick.
    Error {
        /// Description.
        message: String,
    },
}

impl SchedulerEvent {
    /// Kebab-case event name, e.g. `task-completed`.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::TaskSubmitted(_) => "task-submitted",
            Self::TaskQueued(_) => "task-queued",
            Self::TaskStarted(_) => "task-started",
            Self::TaskProgress { .. } => "task-progress",
            Self::TaskCompleted(_) => "task-completed",
            Self::TaskFailed(_) => "task-failed",
            Self::TaskRetry(_) => "task-retry",
            Self::TaskCancelled(_) => "task-cancelled",
            Self::TaskExpired(_) => "task-expired",
            Self::ExecutorRegistered { .. } => "executor-registered",
            Self::CleanupCompleted { .. } => "cleanup-completed",
            Self::ResourceUsageUpdated(_) => "resource-usage-updated",
            Self::Shutdown => "shutdown",
            Self::Error { .. } => "error",
        }
    }

    /// Task snapshot carried by the event, if any.
    #[must_use]
    pub const fn task(&self) -> Option<&Task> {
        match self {
            Self::TaskSubmitted(t)
            | Self::TaskQueued(t)
            | Self::TaskStarted(t)
            | Self::TaskCompleted(t)
            | Self::TaskFailed(t)
            | Self::TaskRetry(t)
            | Self::TaskCancelled(t)
            | Self::TaskExpired(t) => Some(t),
            _ => None,
        }
    }
}

/// Synchronous event observer.
pub trait EventListener: Send + Sync {
    /// Handle one event. Must not block for long.
    fn on_event(&self, event: &SchedulerEvent);
}

/// Bounded in-memory event log for tests and dashboards.
#[derive(Clone)]
pub struct InMemoryEventSink {
    events: Arc<Mutex<VecDeque<SchedulerEvent>>>,
    max_events: usize,
}

impl InMemoryEventSink {
    /// Create a sink keeping at most `max_events`, dropping the oldest first.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::with_capacity(max_events.min(1024)))),
            max_events,
        }
    }

    /// Snapshot of stored events.
    #[must_use]
    pub fn events(&self) -> Vec<SchedulerEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Names of stored events in arrival order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(SchedulerEvent::name).collect()
    }

    /// Drop everything recorded so far.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventListener for InMemoryEventSink {
    fn on_event(&self, event: &SchedulerEvent) {
        if self.max_events == 0 {
            return;
        }
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event.clone());
    }
}

/// Delivers events to listeners and broadcast subscribers in publish order.
pub struct EventNotifier {
    tx: broadcast::Sender<SchedulerEvent>,
    listeners: RwLock<Vec<Arc<dyn EventListener>>>,
    outbox: Mutex<VecDeque<SchedulerEvent>>,
    delivering: Mutex<()>,
}

impl EventNotifier {
    /// Create a notifier whose broadcast channel buffers `capacity` events per
    /// subscriber. Slow subscribers observe `Lagged` rather than blocking the scheduler.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            listeners: RwLock::new(Vec::new()),
            outbox: Mutex::new(VecDeque::new()),
            delivering: Mutex::new(()),
        }
    }

    /// Register a synchronous listener.
    pub fn add_listener(&self, listener: Arc<dyn EventListener>) {
        self.listeners.write().push(listener);
    }

    /// New broadcast receiver; sees events emitted after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.tx.subscribe()
    }

    /// Append events to the outbox without delivering them. Call while holding
    /// the lock that orders the state changes the events describe.
    pub fn publish(&self, events: impl IntoIterator<Item = SchedulerEvent>) {
        self.outbox.lock().extend(events);
    }

    /// Deliver queued events in order. Returns immediately when another drain
    /// is in progress; that drain delivers what this caller published.
    pub fn flush(&self) {
        loop {
            let Some(guard) = self.delivering.try_lock() else {
                return;
            };
            loop {
                let Some(event) = self.outbox.lock().pop_front() else {
                    break;
                };
                self.deliver(event);
            }
            drop(guard);
            // Events published between the last pop and the unlock.
            if self.outbox.lock().is_empty() {
                return;
            }
        }
    }

    /// Publish and flush one event.
    pub fn emit(&self, event: SchedulerEvent) {
        self.publish([event]);
        self.flush();
    }

    fn deliver(&self, event: SchedulerEvent) {
        tracing::trace!(event = event.name(), "delivering scheduler event");
        let listeners = self.listeners.read().clone();
        for listener in &listeners {
            listener.on_event(&event);
        }
        // No subscribers is not an error.
        let _ = self.tx.send(event);
    }
}
