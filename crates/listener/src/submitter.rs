//! Job submission onto the work queue.

use std::sync::Arc;
use std::time::Duration;

use compilebot_core::job::{encode_job, Job};
use compilebot_core::{CodecError, RequestId};
use compilebot_queue::{QueueError, WorkQueue};

/// Errors from [`JobSubmitter::submit`].
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Encode(#[from] CodecError),

    #[error("Failed to enqueue job: {0}")]
    Enqueue(#[from] QueueError),

    /// No answer within the bound. The push keeps running and may still
    /// land; the registry entry stays so its output is delivered if so.
    #[error("Enqueue timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

/// Serializes jobs and pushes them onto the outbound queue.
pub struct JobSubmitter {
    queue: Arc<dyn WorkQueue>,
    timeout: Duration,
}

impl JobSubmitter {
    /// `timeout` bounds each enqueue call.
    pub fn new(queue: Arc<dyn WorkQueue>, timeout: Duration) -> Self {
        Self { queue, timeout }
    }

    pub async fn submit(
        &self,
        request_id: &RequestId,
        channel_id: &str,
        code: &str,
        language: &str,
    ) -> Result<(), SubmitError> {
        let job = Job {
            channel_id: channel_id.to_string(),
            code: code.to_string(),
            language: language.to_string(),
            request_id: request_id.clone(),
        };
        let item = encode_job(&job)?;

        // A timeout stops the wait, not the push.
        let queue = Arc::clone(&self.queue);
        let mut task = tokio::spawn(async move { queue.enqueue(&item).await });

        match tokio::time::timeout(self.timeout, &mut task).await {
            Ok(Ok(result)) => result?,
            Ok(Err(e)) => return Err(QueueError::Aborted(e.to_string()).into()),
            Err(_) => {
                let request_id = request_id.clone();
                tokio::spawn(async move {
                    match task.await {
                        Ok(Ok(())) => {
                            tracing::warn!(request_id = %request_id, "Timed-out job was enqueued late");
                        }
                        Ok(Err(e)) => {
                            tracing::warn!(request_id = %request_id, error = %e, "Timed-out job was not enqueued");
                        }
                        Err(e) => {
                            tracing::warn!(request_id = %request_id, error = %e, "Timed-out enqueue aborted");
                        }
                    }
                });
                return Err(SubmitError::Timeout(self.timeout));
            }
        }

        tracing::debug!(request_id = %request_id, channel_id, language, "Job enqueued");
        Ok(())
    }
}
