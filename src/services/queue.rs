//! In-memory FIFO queues with push-dedup by id.
//!
//! Bursts of "this policy changed / this task progressed" events collapse
//! into at most one pending reconciliation per entity. Queues are not
//! persisted; the cron producers rebuild them from the store within a tick
//! after restart.

use std::collections::VecDeque;
use std::sync::Mutex;
use uuid::Uuid;

/// Correlation id carried through a handle's whole processing, for logs.
pub fn new_handle_id() -> String {
    Uuid::new_v4().simple().to_string()
}

pub trait QueueHandle: Clone + Send {
    fn id(&self) -> i64;
}

/// Pending policy reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyHandle {
    pub id: i64,
    pub handle_id: String,
}

impl PolicyHandle {
    pub fn new(id: i64) -> Self {
        Self { id, handle_id: new_handle_id() }
    }

    pub fn with_handle_id(id: i64, handle_id: impl Into<String>) -> Self {
        Self { id, handle_id: handle_id.into() }
    }
}

impl QueueHandle for PolicyHandle {
    fn id(&self) -> i64 {
        self.id
    }
}

/// Pending task supplementation.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskHandle {
    pub id: i64,
    pub policy_id: i64,
    pub handle_id: String,
}

impl TaskHandle {
    pub fn new(id: i64, policy_id: i64) -> Self {
        Self { id, policy_id, handle_id: new_handle_id() }
    }

    pub fn with_handle_id(id: i64, policy_id: i64, handle_id: impl Into<String>) -> Self {
        Self { id, policy_id, handle_id: handle_id.into() }
    }
}

impl QueueHandle for TaskHandle {
    fn id(&self) -> i64 {
        self.id
    }
}

/// FIFO with push-dedup by handle id. All operations are serialized.
pub struct DedupQueue<H: QueueHandle> {
    inner: Mutex<VecDeque<H>>,
}

impl<H: QueueHandle> Default for DedupQueue<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: QueueHandle> DedupQueue<H> {
    pub fn new() -> Self {
        Self { inner: Mutex::new(VecDeque::new()) }
    }

    /// Append unless an element with the same id is already queued.
    /// Returns whether the handle was enqueued.
    pub fn push(&self, handle: H) -> bool {
        let mut queue = self.inner.lock().unwrap();
        if queue.iter().any(|h| h.id() == handle.id()) {
            return false;
        }
        queue.push_back(handle);
        true
    }

    /// Non-blocking pop.
    pub fn pop(&self) -> Option<H> {
        self.inner.lock().unwrap().pop_front()
    }

    /// Snapshot for observability.
    pub fn list(&self) -> Vec<H> {
        self.inner.lock().unwrap().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }
}

pub type PolicyQueue = DedupQueue<PolicyHandle>;
pub type TaskQueue = DedupQueue<TaskHandle>;
