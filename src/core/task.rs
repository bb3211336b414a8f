//! Task records and submission requests.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::lifecycle::TaskStatus;

/// Task identifier.
pub type TaskId = String;

/// Priority tiers, lowest first so the derived `Ord` ranks `Critical` highest.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Background work.
    Low,
    /// Default tier.
    #[default]
    Medium,
    /// Time-sensitive work.
    High,
    /// Always admitted first.
    Critical,
}

/// Submission request for a new task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Caller-supplied identifier; generated when absent.
    #[serde(default)]
    pub id: Option<TaskId>,
    /// Executor selector.
    pub task_type: String,
    /// Queue ordering tier.
    #[serde(default)]
    pub priority: Priority,
    /// Opaque domain payload.
    pub payload: serde_json::Value,
    /// Free-form annotations.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    /// Free-form labels used for filtering.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Time the task may wait in the queue before it expires.
    #[serde(default)]
    pub ttl_ms: Option<u64>,
    /// Retry budget; the scheduler default applies when absent.
    #[serde(default)]
    pub max_retries: Option<u32>,
}

impl TaskSpec {
    /// Start a spec with the required fields.
    pub fn new(task_type: impl Into<String>, priority: Priority, payload: serde_json::Value) -> Self {
        Self {
            task_type: task_type.into(),
            priority,
            payload,
            ..Self::default()
        }
    }

    /// Set an explicit identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<TaskId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Add a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Set the queue TTL.
    #[must_use]
    pub const fn with_ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.ttl_ms = Some(ttl_ms);
        self
    }

    /// Set the retry budget.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }
}

/// A unit of work tracked by the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier.
    pub id: TaskId,
    /// Executor selector.
    pub task_type: String,
    /// Queue ordering tier; fixed after submission.
    pub priority: Priority,
    /// Opaque domain payload.
    pub payload: serde_json::Value,
    /// Free-form annotations.
    pub metadata: HashMap<String, serde_json::Value>,
    /// Free-form labels.
    pub tags: Vec<String>,
    /// Queue TTL in milliseconds.
    pub ttl_ms: Option<u64>,
    /// Lifecycle status.
    pub status: TaskStatus,
    /// Completion percentage, 0..=100.
    pub progress: u8,
    /// Submission time (epoch ms).
    pub submitted_at_ms: u64,
    /// Advisory start estimate (epoch ms).
    pub estimated_start_ms: u64,
    /// Start of the latest attempt (epoch ms).
    pub started_at_ms: Option<u64>,
    /// Time the task reached a terminal status or last failed (epoch ms).
    pub ended_at_ms: Option<u64>,
    /// Executor result on success.
    pub result: Option<serde_json::Value>,
    /// Last failure reason.
    pub error: Option<String>,
    /// Failed attempts so far.
    pub retry_count: u32,
    /// Failed attempts allowed before the task is terminally failed.
    pub max_retries: u32,
    /// Execution attempts dispatched so far.
    pub attempts: u32,
}

impl Task {
    /// Build a `Pending` task from a spec. `id` wins over `spec.id`.
    #[must_use]
    pub fn from_spec(id: TaskId, spec: TaskSpec, default_max_retries: u32, now_ms: u64) -> Self {
        Self {
            id,
            task_type: spec.task_type,
            priority: spec.priority,
            payload: spec.payload,
            metadata: spec.metadata,
            tags: spec.tags,
            ttl_ms: spec.ttl_ms,
            status: TaskStatus::Pending,
            progress: 0,
            submitted_at_ms: now_ms,
            estimated_start_ms: now_ms,
            started_at_ms: None,
            ended_at_ms: None,
            result: None,
            error: None,
            retry_count: 0,
            max_retries: spec.max_retries.unwrap_or(default_max_retries),
            attempts: 0,
        }
    }

    /// Whether the task carries `tag`.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Timestamp used for retention decisions.
    #[must_use]
    pub fn retention_anchor_ms(&self) -> u64 {
        self.ended_at_ms.unwrap_or(self.submitted_at_ms)
    }

    /// Whether the queue TTL has elapsed at `now_ms`.
    #[must_use]
    pub fn ttl_elapsed(&self, now_ms: u64) -> bool {
        self.ttl_ms
            .is_some_and(|ttl| now_ms.saturating_sub(self.submitted_at_ms) >= ttl)
    }
}
