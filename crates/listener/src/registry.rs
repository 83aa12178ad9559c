//! Routing table from request id to reply capability.

use std::collections::HashMap;

use compilebot_core::{RequestId, SessionHandle};
use tokio::sync::RwLock;

/// Maps each outstanding request to the session that must receive its
/// output.
///
/// Written by the command path, read by the poller; the interior
/// `RwLock` lets both run concurrently. Wrap in `Arc` and share.
///
/// Entries are never evicted, so a redelivered result still finds its
/// session.
pub struct RequestRegistry<H = SessionHandle> {
    entries: RwLock<HashMap<RequestId, H>>,
}

impl<H: Clone> RequestRegistry<H> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Store the session for `request_id`, replacing any existing entry.
    pub async fn register(&self, request_id: RequestId, handle: H) {
        let mut entries = self.entries.write().await;
        if entries.contains_key(&request_id) {
            tracing::warn!(request_id = %request_id, "Request id collision, replacing session");
        }
        entries.insert(request_id, handle);
    }

    /// Session registered for `request_id`, if any.
    pub async fn lookup(&self, request_id: &str) -> Option<H> {
        self.entries.read().await.get(request_id).cloned()
    }

    /// Number of registered requests.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl<H: Clone> Default for RequestRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}
