//! Shared fakes for listener integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use compilebot_core::chat::{ChatError, ChatSender};
use compilebot_core::{InboundMessage, LanguageAllowList, SessionHandle};
use compilebot_listener::{CommandHandler, JobSubmitter, RequestRegistry};
use compilebot_queue::{MemoryQueue, QueueError, WorkQueue};

/// Records every message instead of posting it.
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingSender {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// `(channel_id, content)` pairs in send order.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|(_, text)| text).collect()
    }
}

#[async_trait]
impl ChatSender for RecordingSender {
    async fn send_message(&self, channel_id: &str, content: &str) -> Result<(), ChatError> {
        self.sent
            .lock()
            .unwrap()
            .push((channel_id.to_string(), content.to_string()));
        Ok(())
    }
}

/// Rejects every send.
pub struct FailingSender;

#[async_trait]
impl ChatSender for FailingSender {
    async fn send_message(&self, _channel_id: &str, _content: &str) -> Result<(), ChatError> {
        Err(ChatError::Rejected {
            status: 403,
            body: "Missing Access".into(),
        })
    }
}

/// Never answers.
pub struct StalledSender;

#[async_trait]
impl ChatSender for StalledSender {
    async fn send_message(&self, _channel_id: &str, _content: &str) -> Result<(), ChatError> {
        std::future::pending().await
    }
}

/// Fails every call as if the backend were down.
pub struct FailingQueue;

#[async_trait]
impl WorkQueue for FailingQueue {
    async fn enqueue(&self, _item: &str) -> Result<(), QueueError> {
        Err(QueueError::Connection("connection refused".into()))
    }

    async fn peek(&self) -> Result<bool, QueueError> {
        Err(QueueError::Connection("connection refused".into()))
    }

    async fn dequeue(&self) -> Result<Option<String>, QueueError> {
        Err(QueueError::Connection("connection refused".into()))
    }
}

/// [`MemoryQueue`] behind a slow link. A push reaches the inner queue only
/// after `delay`; a pop takes the item at once and answers after `delay`.
pub struct LateReplyQueue {
    pub inner: MemoryQueue,
    pub delay: Duration,
}

impl LateReplyQueue {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryQueue::new(),
            delay,
        })
    }
}

#[async_trait]
impl WorkQueue for LateReplyQueue {
    async fn enqueue(&self, item: &str) -> Result<(), QueueError> {
        tokio::time::sleep(self.delay).await;
        self.inner.enqueue(item).await
    }

    async fn peek(&self) -> Result<bool, QueueError> {
        self.inner.peek().await
    }

    async fn dequeue(&self) -> Result<Option<String>, QueueError> {
        let item = self.inner.dequeue().await?;
        tokio::time::sleep(self.delay).await;
        Ok(item)
    }
}

pub const CHANNEL: &str = "555000111";

pub fn message(content: &str) -> InboundMessage {
    InboundMessage {
        channel_id: CHANNEL.into(),
        author_id: "42".into(),
        content: content.into(),
        from_self: false,
    }
}

pub fn session(sender: &Arc<RecordingSender>) -> SessionHandle {
    Arc::clone(sender) as SessionHandle
}

/// Handler over the given job queue with the default `go,python` list.
pub fn handler(queue: Arc<dyn WorkQueue>) -> (CommandHandler, Arc<RequestRegistry>) {
    let registry: Arc<RequestRegistry> = Arc::new(RequestRegistry::new());
    let submitter = JobSubmitter::new(queue, Duration::from_secs(1));
    let handler = CommandHandler::new(
        LanguageAllowList::default(),
        Arc::clone(&registry),
        submitter,
    )
    .with_send_timeout(Duration::from_millis(200));
    (handler, registry)
}

pub fn memory_queue() -> Arc<MemoryQueue> {
    Arc::new(MemoryQueue::new())
}
