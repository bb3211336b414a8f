//! Priority queue of pending task ids.
//!
//! Kept as a sequence sorted by descending priority. Insertion goes in front of
//! the first entry with strictly lower priority, so equal priorities stay in
//! arrival order (FIFO within a tier). Linear insertion is fine at the queue
//! sizes the scheduler bounds it to, and it lets admission scan past heads that
//! do not fit the resource budget.

use crate::core::{Priority, SchedulerError, TaskId};

#[derive(Debug, Clone)]
struct QueueEntry {
    id: TaskId,
    priority: Priority,
}

/// Bounded, priority-ordered queue of task ids.
#[derive(Debug, Clone)]
pub struct PriorityQueue {
    max_depth: usize,
    entries: Vec<QueueEntry>,
}

impl PriorityQueue {
    /// Create an empty queue that accepts at most `max_depth` submissions.
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            entries: Vec::with_capacity(max_depth.min(1024)),
        }
    }

    /// Insert a newly submitted task, honoring the depth limit.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::QueueFull`] when the queue is at capacity; the queue
    /// is left untouched.
    pub fn enqueue(&mut self, id: TaskId, priority: Priority) -> Result<usize, SchedulerError> {
        if self.is_full() {
            return Err(SchedulerError::QueueFull {
                capacity: self.max_depth,
            });
        }
        Ok(self.insert(id, priority))
    }

    /// Re-insert a task coming back from a failed attempt. Not subject to the
    /// depth limit: the task already held a slot when it was submitted.
    pub fn requeue(&mut self, id: TaskId, priority: Priority) -> usize {
        self.insert(id, priority)
    }

    fn insert(&mut self, id: TaskId, priority: Priority) -> usize {
        let pos = self
            .entries
            .iter()
            .position(|e| e.priority < priority)
            .unwrap_or(self.entries.len());
        self.entries.insert(pos, QueueEntry { id, priority });
        pos
    }

    /// Remove a task by id. Returns whether it was queued.
    pub fn remove(&mut self, id: &str) -> bool {
        match self.entries.iter().position(|e| e.id == id) {
            Some(pos) => {
                self.entries.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Iterate `(id, priority)` head to tail.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Priority)> + '_ {
        self.entries.iter().map(|e| (e.id.as_str(), e.priority))
    }

    /// Ids head to tail.
    #[must_use]
    pub fn ids(&self) -> Vec<TaskId> {
        self.entries.iter().map(|e| e.id.clone()).collect()
    }

    /// Current depth.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a new submission would be rejected.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.max_depth
    }

    /// Configured depth limit.
    #[must_use]
    pub const fn max_depth(&self) -> usize {
        self.max_depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_ordering() {
        let mut q = PriorityQueue::new(100);
        q.enqueue("1".into(), Priority::Low).unwrap();
        q.enqueue("2".into(), Priority::Critical).unwrap();
        q.enqueue("3".into(), Priority::Medium).unwrap();
        q.enqueue("4".into(), Priority::High).unwrap();

        assert_eq!(q.ids(), vec!["2", "4", "3", "1"]);
    }

    #[test]
    fn test_fifo_within_priority() {
        let mut q = PriorityQueue::new(100);
        q.enqueue("a".into(), Priority::Medium).unwrap();
        q.enqueue("hi".into(), Priority::High).unwrap();
        q.enqueue("b".into(), Priority::Medium).unwrap();
        q.enqueue("c".into(), Priority::Medium).unwrap();

        assert_eq!(q.ids(), vec!["hi", "a", "b", "c"]);
        assert!(q.remove("hi"));
        assert_eq!(q.iter().next(), Some(("a", Priority::Medium)));
    }

    #[test]
    fn test_queue_full_leaves_queue_untouched() {
        let mut q = PriorityQueue::new(2);
        q.enqueue("1".into(), Priority::Medium).unwrap();
        q.enqueue("2".into(), Priority::Medium).unwrap();

        let err = q.enqueue("3".into(), Priority::Critical).unwrap_err();
        assert_eq!(err, SchedulerError::QueueFull { capacity: 2 });
        assert_eq!(q.ids(), vec!["1", "2"]);
    }

    #[test]
    fn test_requeue_ignores_depth_and_goes_behind_peers() {
        let mut q = PriorityQueue::new(1);
        q.enqueue("1".into(), Priority::High).unwrap();
        assert_eq!(q.requeue("2".into(), Priority::High), 1);
        assert_eq!(q.requeue("3".into(), Priority::Critical), 0);
        assert_eq!(q.ids(), vec!["3", "1", "2"]);
    }

    #[test]
    fn test_remove() {
        let mut q = PriorityQueue::new(10);
        q.enqueue("1".into(), Priority::Low).unwrap();
        q.enqueue("2".into(), Priority::Low).unwrap();
        assert!(q.remove("1"));
        assert!(!q.remove("1"));
        assert_eq!(q.ids(), vec!["2"]);
        assert_eq!(q.len(), 1);
    }
}
