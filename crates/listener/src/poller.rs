//! Result poller.
//!
//! Runs on a fixed interval. Each tick checks the result queue, takes at
//! most one item, and delivers it to the session registered for its
//! request id. One item per tick caps delivery at one result per
//! interval regardless of queue depth.
//!
//! Ticks run one at a time inside the loop; a slow tick delays the next
//! one (missed ticks are skipped, not bunched). Cancellation is checked
//! between ticks, so an in-flight tick always finishes.
//!
//! A dequeue removes the item on the server, so it is never abandoned on
//! timeout. It runs as its own task; if the reply is late, the task is
//! kept and the next tick collects its item before touching the queue.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use compilebot_core::job::decode_response;
use compilebot_core::{log_preview, replies, RequestId};
use compilebot_queue::{QueueError, WorkQueue};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::handler::DEFAULT_SEND_TIMEOUT;
use crate::registry::RequestRegistry;

/// Default period between ticks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default bound on each queue call.
pub const DEFAULT_QUEUE_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing waiting.
    Idle,
    /// The queue could not be read this tick.
    QueueUnavailable,
    /// A dequeue is still waiting for its reply; it is collected next tick.
    DequeuePending,
    Delivered(RequestId),
    /// An item was consumed but not delivered.
    Dropped(DropReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// Not a valid response payload.
    Undecodable,
    /// No session was registered for this id (e.g. it predates a restart).
    UnknownRequest(RequestId),
    /// The chat platform did not accept the message.
    SendFailed(RequestId),
}

type DequeueTask = JoinHandle<Result<Option<String>, QueueError>>;

enum Dequeued {
    Item(String),
    Empty,
    /// Parked in `ResponsePoller::pending`.
    Pending,
    Failed,
}

/// Drains the result queue into chat channels.
pub struct ResponsePoller {
    queue: Arc<dyn WorkQueue>,
    registry: Arc<RequestRegistry>,
    interval: Duration,
    queue_timeout: Duration,
    send_timeout: Duration,
    /// Dequeue that outlived `queue_timeout`.
    pending: Mutex<Option<DequeueTask>>,
}

impl ResponsePoller {
    pub fn new(queue: Arc<dyn WorkQueue>, registry: Arc<RequestRegistry>) -> Self {
        Self {
            queue,
            registry,
            interval: DEFAULT_POLL_INTERVAL,
            queue_timeout: DEFAULT_QUEUE_TIMEOUT,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            pending: Mutex::new(None),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Bound queue calls and chat sends separately.
    pub fn with_timeouts(mut self, queue_timeout: Duration, send_timeout: Duration) -> Self {
        self.queue_timeout = queue_timeout;
        self.send_timeout = send_timeout;
        self
    }

    /// Tick until `cancel` is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            "Response poller started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    if self.pending.lock().await.is_some() {
                        // Give a late dequeue one more chance to deliver.
                        self.tick().await;
                    }
                    if self.pending.lock().await.is_some() {
                        tracing::warn!("Stopping with a dequeue in flight; its item may be lost");
                    }
                    tracing::info!("Response poller stopping");
                    break;
                }
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }
    }

    /// Run one poll: peek, dequeue at most one item, deliver it.
    ///
    /// A dequeue left over from an earlier tick is collected first and
    /// counts as this tick's item.
    pub async fn tick(&self) -> TickOutcome {
        let carried = self.pending.lock().await.take();

        let task = match carried {
            Some(task) => task,
            None => {
                let Some(ready) = self.queue_call("peek", self.queue.peek()).await else {
                    return TickOutcome::QueueUnavailable;
                };
                if !ready {
                    return TickOutcome::Idle;
                }
                let queue = Arc::clone(&self.queue);
                tokio::spawn(async move { queue.dequeue().await })
            }
        };

        let item = match self.collect_dequeue(task).await {
            Dequeued::Item(item) => item,
            // Another consumer got there first.
            Dequeued::Empty => return TickOutcome::Idle,
            Dequeued::Pending => return TickOutcome::DequeuePending,
            Dequeued::Failed => return TickOutcome::QueueUnavailable,
        };

        let response = match decode_response(&item) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    bytes = item.len(),
                    preview = log_preview(&item),
                    "Dropping undecodable response",
                );
                return TickOutcome::Dropped(DropReason::Undecodable);
            }
        };

        let request_id = response.request_id;

        let Some(session) = self.registry.lookup(request_id.as_str()).await else {
            tracing::warn!(
                request_id = %request_id,
                channel_id = %response.channel_id,
                "Dropping response for unknown request",
            );
            return TickOutcome::Dropped(DropReason::UnknownRequest(request_id));
        };

        let text = replies::output_for(&request_id, &response.response);

        match tokio::time::timeout(
            self.send_timeout,
            session.send_message(&response.channel_id, &text),
        )
        .await
        {
            Ok(Ok(())) => {
                let registered = self.registry.len().await;
                tracing::info!(
                    request_id = %request_id,
                    channel_id = %response.channel_id,
                    registered,
                    "Delivered output",
                );
                TickOutcome::Delivered(request_id)
            }
            Ok(Err(e)) => {
                tracing::error!(request_id = %request_id, error = %e, "Failed to deliver output");
                TickOutcome::Dropped(DropReason::SendFailed(request_id))
            }
            Err(_) => {
                tracing::error!(
                    request_id = %request_id,
                    timeout_ms = self.send_timeout.as_millis() as u64,
                    "Output delivery timed out",
                );
                TickOutcome::Dropped(DropReason::SendFailed(request_id))
            }
        }
    }

    /// Wait up to the queue timeout for a dequeue task. A task that is
    /// still running is parked for the next tick.
    async fn collect_dequeue(&self, mut task: DequeueTask) -> Dequeued {
        match tokio::time::timeout(self.queue_timeout, &mut task).await {
            Ok(Ok(Ok(Some(item)))) => Dequeued::Item(item),
            Ok(Ok(Ok(None))) => Dequeued::Empty,
            Ok(Ok(Err(e))) => {
                tracing::error!(op = "dequeue", error = %e, "Result queue call failed");
                Dequeued::Failed
            }
            Ok(Err(e)) => {
                let e = QueueError::Aborted(e.to_string());
                tracing::error!(op = "dequeue", error = %e, "Result queue call failed");
                Dequeued::Failed
            }
            Err(_) => {
                tracing::warn!(
                    op = "dequeue",
                    timeout_ms = self.queue_timeout.as_millis() as u64,
                    "Dequeue reply is late, collecting it next tick",
                );
                *self.pending.lock().await = Some(task);
                Dequeued::Pending
            }
        }
    }

    /// Await a queue call under the queue timeout. Failures are logged
    /// and reported as `None`.
    async fn queue_call<T>(
        &self,
        op: &'static str,
        call: impl Future<Output = Result<T, QueueError>>,
    ) -> Option<T> {
        match tokio::time::timeout(self.queue_timeout, call).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                tracing::error!(op, error = %e, "Result queue call failed");
                None
            }
            Err(_) => {
                tracing::error!(
                    op,
                    timeout_ms = self.queue_timeout.as_millis() as u64,
                    "Result queue call timed out",
                );
                None
            }
        }
    }
}
