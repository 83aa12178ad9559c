//! In-process queue.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{QueueError, WorkQueue};

/// [`WorkQueue`] held in memory.
///
/// Also counts every successful enqueue so callers can assert how many
/// items were ever submitted, independent of later dequeues.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    items: Mutex<VecDeque<String>>,
    enqueued: AtomicUsize,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of items ever enqueued.
    pub fn enqueued_count(&self) -> usize {
        self.enqueued.load(Ordering::SeqCst)
    }

    /// Number of items currently waiting.
    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }

    /// Copy of the waiting items, head first.
    pub async fn snapshot(&self) -> Vec<String> {
        self.items.lock().await.iter().cloned().collect()
    }
}

#[async_trait]
impl WorkQueue for MemoryQueue {
    async fn enqueue(&self, item: &str) -> Result<(), QueueError> {
        self.items.lock().await.push_back(item.to_string());
        self.enqueued.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn peek(&self) -> Result<bool, QueueError> {
        Ok(!self.items.lock().await.is_empty())
    }

    async fn dequeue(&self) -> Result<Option<String>, QueueError> {
        Ok(self.items.lock().await.pop_front())
    }
}
