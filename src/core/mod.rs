//! Core scheduling abstractions: task model, lifecycle, executors, resources,
//! events, and the scheduler itself.

pub mod error;
pub mod events;
pub mod executor;
pub mod lifecycle;
pub mod resources;
pub mod scheduler;
pub mod spawn;
pub mod stats;
pub mod task;

pub use error::{AppResult, ExecutionError, SchedulerError};
pub use events::{EventListener, EventNotifier, InMemoryEventSink, SchedulerEvent};
pub use executor::{ExecutionContext, ExecutorRegistry, TaskExecutor};
pub use lifecycle::{TaskEvent, TaskStatus};
pub use resources::{ResourceLimits, ResourceRequirements, ResourceTracker, ResourceUsage};
pub use scheduler::Scheduler;
pub use spawn::Spawn;
pub use stats::TaskManagerStats;
pub use task::{Priority, Task, TaskId, TaskSpec};
