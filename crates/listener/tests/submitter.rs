//! Job submission against slow and failing queues.

mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use compilebot_core::job::Job;
use compilebot_core::RequestId;
use compilebot_listener::{JobSubmitter, SubmitError};
use compilebot_queue::QueueError;

use common::{memory_queue, FailingQueue, LateReplyQueue};

// ---------------------------------------------------------------------------
// Test: a submitted job is encoded onto the queue
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submit_enqueues_encoded_job() {
    let queue = memory_queue();
    let submitter = JobSubmitter::new(queue.clone(), Duration::from_secs(1));
    let id = RequestId::from("subsubsubs");

    submitter.submit(&id, "77", "print(1)", "python").await.unwrap();

    let items = queue.snapshot().await;
    assert_eq!(items.len(), 1);
    let job: Job = serde_json::from_str(&items[0]).unwrap();
    assert_eq!(job.request_id, id);
    assert_eq!(job.channel_id, "77");
}

// ---------------------------------------------------------------------------
// Test: enqueue errors surface as SubmitError::Enqueue
// ---------------------------------------------------------------------------

#[tokio::test]
async fn enqueue_error_is_reported() {
    let submitter = JobSubmitter::new(Arc::new(FailingQueue), Duration::from_secs(1));

    let err = submitter
        .submit(&RequestId::from("failfailfa"), "1", "x", "go")
        .await
        .unwrap_err();
    assert_matches!(err, SubmitError::Enqueue(QueueError::Connection(_)));
}

// ---------------------------------------------------------------------------
// Test: a timed-out push is not cancelled and still lands
// ---------------------------------------------------------------------------

#[tokio::test]
async fn timed_out_push_still_lands() {
    let queue = LateReplyQueue::new(Duration::from_millis(300));
    let submitter = JobSubmitter::new(queue.clone(), Duration::from_millis(50));

    let err = submitter
        .submit(&RequestId::from("slowslowsl"), "1", "x", "go")
        .await
        .unwrap_err();
    assert_matches!(err, SubmitError::Timeout(d) if d == Duration::from_millis(50));
    assert_eq!(queue.inner.enqueued_count(), 0);

    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(queue.inner.enqueued_count(), 1);
    let job: Job = serde_json::from_str(&queue.inner.snapshot().await[0]).unwrap();
    assert_eq!(job.request_id, RequestId::from("slowslowsl"));
}
