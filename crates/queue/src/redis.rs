//! Redis list-backed queue.
//!
//! | Operation | Redis command |
//! |-----------|---------------|
//! | enqueue   | `RPUSH key item` |
//! | peek      | `LLEN key` > 0 |
//! | dequeue   | `LPOP key` |
//! | purge     | `LLEN key` then `DEL key` |

use ::redis::aio::MultiplexedConnection;
use ::redis::AsyncCommands;
use async_trait::async_trait;

use crate::{QueueError, WorkQueue};

/// One Redis list used as a FIFO queue.
///
/// Holds a [`MultiplexedConnection`], which is cheap to clone; every
/// operation works on its own clone so the queue can be shared freely.
#[derive(Clone)]
pub struct RedisQueue {
    conn: MultiplexedConnection,
    key: String,
}

impl RedisQueue {
    /// Connect to Redis and bind to the list at `key`.
    ///
    /// `host` is either `host:port` or a full `redis://` URL. Fails fast
    /// when the server cannot be reached.
    pub async fn connect(host: &str, key: impl Into<String>) -> Result<Self, QueueError> {
        let url = redis_url(host);
        let client = ::redis::Client::open(url.as_str())
            .map_err(|e| QueueError::Connection(format!("invalid Redis address {url}: {e}")))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| QueueError::Connection(format!("failed to connect to {url}: {e}")))?;

        let key = key.into();
        tracing::info!(url = %url, key = %key, "Connected to Redis queue");

        Ok(Self::with_connection(conn, key))
    }

    /// Bind an existing connection to the list at `key`.
    pub fn with_connection(conn: MultiplexedConnection, key: impl Into<String>) -> Self {
        Self {
            conn,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Drop every waiting item. Returns how many were discarded.
    pub async fn purge(&self) -> Result<usize, QueueError> {
        let mut conn = self.conn.clone();
        let pending: usize = conn
            .llen(&self.key)
            .await
            .map_err(|e| self.command_error(e))?;
        let _: usize = conn
            .del(&self.key)
            .await
            .map_err(|e| self.command_error(e))?;
        Ok(pending)
    }

    fn command_error(&self, err: ::redis::RedisError) -> QueueError {
        QueueError::Command {
            key: self.key.clone(),
            message: err.to_string(),
        }
    }
}

impl std::fmt::Debug for RedisQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisQueue").field("key", &self.key).finish()
    }
}

#[async_trait]
impl WorkQueue for RedisQueue {
    async fn enqueue(&self, item: &str) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let _: usize = conn
            .rpush(&self.key, item)
            .await
            .map_err(|e| self.command_error(e))?;
        Ok(())
    }

    async fn peek(&self) -> Result<bool, QueueError> {
        let mut conn = self.conn.clone();
        let len: usize = conn
            .llen(&self.key)
            .await
            .map_err(|e| self.command_error(e))?;
        Ok(len > 0)
    }

    async fn dequeue(&self) -> Result<Option<String>, QueueError> {
        let mut conn = self.conn.clone();
        conn.lpop(&self.key, None)
            .await
            .map_err(|e| self.command_error(e))
    }
}

/// Normalise a configured host into a connection URL.
pub fn redis_url(host: &str) -> String {
    if host.contains("://") {
        host.to_string()
    } else {
        format!("redis://{host}")
    }
}
