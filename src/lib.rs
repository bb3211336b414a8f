//! # Task Scheduler
//!
//! A priority-based task scheduler with resource-aware admission control.
//!
//! Workflow domains (infrastructure, security, quality, research, ...) submit
//! units of work that run under bounded concurrency and bounded resource
//! budgets. What a task actually *does* lives behind a pluggable
//! [`TaskExecutor`](core::TaskExecutor) registered per task type; the scheduler
//! decides *when* it runs.
//!
//! ## Key Features
//!
//! - **Priority queue**: `Critical > High > Medium > Low`, FIFO within a tier
//! - **Admission control**: concurrency limit plus memory/CPU budgets checked
//!   against both sampled usage and what admitted tasks reserved
//! - **Bounded retries**: failed attempts re-compete from the queue until the
//!   retry budget is spent
//! - **Cooperative cancellation**: running attempts get a cancellation token;
//!   their late results are discarded
//! - **TTL expiry**: queued tasks whose TTL elapsed are expired by the admission tick
//! - **Retention**: a cleanup tick prunes old terminal records
//! - **Notifications**: synchronous listeners plus a broadcast channel
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use task_scheduler::builders::SchedulerBuilder;
//! use task_scheduler::core::{Priority, TaskSpec};
//! use task_scheduler::runtime::TokioSpawner;
//!
//! let scheduler = SchedulerBuilder::new(TokioSpawner::current()?)
//!     .executor("deploy", Arc::new(DeployExecutor))
//!     .start_loops(true)
//!     .build()?;
//!
//! let task = scheduler.submit(
//!     TaskSpec::new("deploy", Priority::High, serde_json::json!({ "service": "api" }))
//!         .with_tag("infrastructure"),
//! )?;
//!
//! let mut events = scheduler.subscribe();
//! while let Ok(event) = events.recv().await {
//!     println!("{}", event.name());
//! }
//! ```
//!
//! For complete examples, see `tests/scheduler_test.rs`.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions and the scheduler.
pub mod core;
/// Configuration models.
pub mod config;
/// Builders to construct a scheduler from configuration.
pub mod builders;
/// In-memory queue, store, and record-store mirror.
pub mod infra;
/// Runtime adapters: tokio spawner and resource sampler loop.
pub mod runtime;
/// Shared utilities.
pub mod util;
