//! Write-through mirror of task records into an external record store.
//!
//! The scheduler does not depend on the mirror; it exists so API layers and
//! dashboards can look tasks up by id or tag without holding the scheduler lock.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::core::{EventListener, SchedulerError, SchedulerEvent, Task};

/// Record store the mirror writes into.
pub trait TaskRecordStore: Send + Sync {
    /// Insert or replace the record for `task.id`.
    ///
    /// # Errors
    ///
    /// Backend-specific failure.
    fn put(&self, task: &Task) -> Result<(), SchedulerError>;

    /// Record by id.
    ///
    /// # Errors
    ///
    /// Backend-specific failure.
    fn get(&self, id: &str) -> Result<Option<Task>, SchedulerError>;

    /// Records carrying `tag`, newest submission first, at most `limit`.
    ///
    /// # Errors
    ///
    /// Backend-specific failure.
    fn query_by_tag(&self, tag: &str, limit: usize) -> Result<Vec<Task>, SchedulerError>;
}

/// In-memory record store for development and tests.
#[derive(Clone, Default)]
pub struct InMemoryRecordStore {
    records: Arc<RwLock<HashMap<String, Task>>>,
}

impl InMemoryRecordStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mirrored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether nothing has been mirrored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl TaskRecordStore for InMemoryRecordStore {
    fn put(&self, task: &Task) -> Result<(), SchedulerError> {
        self.records.write().insert(task.id.clone(), task.clone());
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<Task>, SchedulerError> {
        Ok(self.records.read().get(id).cloned())
    }

    fn query_by_tag(&self, tag: &str, limit: usize) -> Result<Vec<Task>, SchedulerError> {
        let records = self.records.read();
        let mut matched: Vec<Task> = records.values().filter(|t| t.has_tag(tag)).cloned().collect();
        matched.sort_by(|a, b| b.submitted_at_ms.cmp(&a.submitted_at_ms));
        matched.truncate(limit);
        Ok(matched)
    }
}

/// Listener that writes every task snapshot through to a [`TaskRecordStore`].
pub struct MirrorListener<R> {
    store: R,
}

impl<R: TaskRecordStore> MirrorListener<R> {
    /// Mirror into `store`.
    pub const fn new(store: R) -> Self {
        Self { store }
    }
}

impl<R: TaskRecordStore> EventListener for MirrorListener<R> {
    fn on_event(&self, event: &SchedulerEvent) {
        let Some(task) = event.task() else {
            return;
        };
        if let Err(e) = self.store.put(task) {
            tracing::warn!(task_id = %task.id, error = %e, "failed to mirror task record");
        }
    }
}
