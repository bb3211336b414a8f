//! In-memory backends: priority queue, task store, and the record-store mirror.

pub mod mirror;
pub mod queue;
pub mod store;

pub use mirror::{InMemoryRecordStore, MirrorListener, TaskRecordStore};
pub use queue::PriorityQueue;
pub use store::{Bucket, TaskFilter, TaskStore};
