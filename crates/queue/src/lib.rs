//! Work and result queues.
//!
//! Both directions use the same FIFO contract ([`WorkQueue`]): items are
//! opaque strings, delivery is at-least-once, and readiness can be checked
//! without consuming anything. [`RedisQueue`] is the production backend;
//! [`MemoryQueue`] backs tests and local runs.

pub mod memory;
pub mod redis;

use async_trait::async_trait;

pub use crate::memory::MemoryQueue;
pub use crate::redis::RedisQueue;

/// A durable FIFO of string items.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Append an item to the tail.
    async fn enqueue(&self, item: &str) -> Result<(), QueueError>;

    /// Whether at least one item is waiting. Never consumes.
    async fn peek(&self) -> Result<bool, QueueError>;

    /// Remove and return the head item, or `None` if the queue is empty.
    async fn dequeue(&self) -> Result<Option<String>, QueueError>;
}

/// Errors raised by queue backends.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// Could not reach the backend.
    #[error("Queue connection error: {0}")]
    Connection(String),

    /// The backend rejected or failed a command.
    #[error("Queue command failed on {key}: {message}")]
    Command {
        /// Queue key the command targeted.
        key: String,
        message: String,
    },

    /// The task running the call stopped before it finished.
    #[error("Queue call aborted: {0}")]
    Aborted(String),
}
