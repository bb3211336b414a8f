//! Keyed task store partitioned by lifecycle bucket.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::core::{Task, TaskId, TaskStatus};

/// Lifecycle partition a record lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    /// Submitted and not yet terminal (pending, queued, running).
    Active,
    /// Completed successfully.
    Completed,
    /// Failed after exhausting retries.
    Failed,
    /// Cancelled or expired.
    Dropped,
}

impl Bucket {
    /// Bucket a record with `status` belongs in.
    #[must_use]
    pub const fn for_status(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Pending | TaskStatus::Queued | TaskStatus::Running => Self::Active,
            TaskStatus::Completed => Self::Completed,
            TaskStatus::Failed => Self::Failed,
            TaskStatus::Cancelled | TaskStatus::Expired => Self::Dropped,
        }
    }

    /// Buckets holding terminal records.
    pub const TERMINAL: [Self; 3] = [Self::Completed, Self::Failed, Self::Dropped];
}

/// Filter for [`TaskStore::list`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskFilter {
    /// Only tasks in this status.
    #[serde(default)]
    pub status: Option<TaskStatus>,
    /// Only tasks carrying this tag.
    #[serde(default)]
    pub tag: Option<String>,
    /// Only tasks of this type.
    #[serde(default)]
    pub task_type: Option<String>,
    /// Records to skip.
    #[serde(default)]
    pub offset: usize,
    /// Maximum records to return; `None` means all.
    #[serde(default)]
    pub limit: Option<usize>,
}

impl TaskFilter {
    fn matches(&self, task: &Task) -> bool {
        self.status.is_none_or(|s| task.status == s)
            && self.tag.as_deref().is_none_or(|t| task.has_tag(t))
            && self
                .task_type
                .as_deref()
                .is_none_or(|t| task.task_type == t)
    }
}

/// Task records keyed by id with bucket membership sets.
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: HashMap<TaskId, Task>,
    buckets: HashMap<Bucket, HashSet<TaskId>>,
}

impl TaskStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record into the bucket matching its status, replacing any
    /// previous record with the same id.
    pub fn insert(&mut self, task: Task) {
        let id = task.id.clone();
        let bucket = Bucket::for_status(task.status);
        self.detach(&id);
        self.buckets.entry(bucket).or_default().insert(id.clone());
        self.tasks.insert(id, task);
    }

    /// Record by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// Mutable record by id. Callers that change `status` must follow up with
    /// [`TaskStore::sync_bucket`].
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.get_mut(id)
    }

    /// Whether a record exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.tasks.contains_key(id)
    }

    /// Move a record to the bucket matching its current status.
    pub fn sync_bucket(&mut self, id: &str) {
        let Some(status) = self.tasks.get(id).map(|t| t.status) else {
            return;
        };
        self.detach(id);
        self.buckets
            .entry(Bucket::for_status(status))
            .or_default()
            .insert(id.to_owned());
    }

    fn detach(&mut self, id: &str) {
        for set in self.buckets.values_mut() {
            set.remove(id);
        }
    }

    /// Remove a record entirely.
    pub fn remove(&mut self, id: &str) -> Option<Task> {
        self.detach(id);
        self.tasks.remove(id)
    }

    /// Number of records in `bucket`.
    #[must_use]
    pub fn bucket_len(&self, bucket: Bucket) -> usize {
        self.buckets.get(&bucket).map_or(0, HashSet::len)
    }

    /// Records in `bucket`, in no particular order.
    pub fn bucket(&self, bucket: Bucket) -> impl Iterator<Item = &Task> + '_ {
        self.buckets
            .get(&bucket)
            .into_iter()
            .flatten()
            .filter_map(|id| self.tasks.get(id))
    }

    /// Number of records with `status`.
    #[must_use]
    pub fn count_status(&self, status: TaskStatus) -> usize {
        self.bucket(Bucket::for_status(status))
            .filter(|t| t.status == status)
            .count()
    }

    /// Matching records, newest submission first, then paginated.
    #[must_use]
    pub fn list(&self, filter: &TaskFilter) -> Vec<Task> {
        let mut matched: Vec<&Task> = self.tasks.values().filter(|t| filter.matches(t)).collect();
        matched.sort_by(|a, b| {
            b.submitted_at_ms
                .cmp(&a.submitted_at_ms)
                .then_with(|| a.id.cmp(&b.id))
        });
        matched
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    /// Remove terminal records whose retention anchor is strictly before
    /// `cutoff_ms`. Active records are never considered.
    pub fn prune_terminal_before(&mut self, cutoff_ms: u64) -> Vec<Task> {
        let stale: Vec<TaskId> = Bucket::TERMINAL
            .iter()
            .flat_map(|b| self.bucket(*b))
            .filter(|t| t.retention_anchor_ms() < cutoff_ms)
            .map(|t| t.id.clone())
            .collect();
        stale.iter().filter_map(|id| self.remove(id)).collect()
    }
}
