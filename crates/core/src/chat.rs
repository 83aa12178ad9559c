//! Seam between the dispatcher and the chat platform.
//!
//! The gateway adapter turns platform events into [`InboundMessage`]s and
//! implements [`ChatSender`] for replies. The dispatcher never sees the
//! platform's own types.

use std::sync::Arc;

use async_trait::async_trait;

/// A message posted in a channel the bot can read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Channel the message was posted in; replies go back here.
    pub channel_id: String,
    /// Platform id of the author.
    pub author_id: String,
    /// Raw message text.
    pub content: String,
    /// Set when the bot itself authored the message.
    pub from_self: bool,
}

/// Capability to post text into a channel.
#[async_trait]
pub trait ChatSender: Send + Sync {
    async fn send_message(&self, channel_id: &str, content: &str) -> Result<(), ChatError>;
}

/// Reply capability stored against each outstanding request.
pub type SessionHandle = Arc<dyn ChatSender>;

/// Errors from posting a message.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// The request never reached the platform (network, DNS, TLS, etc.).
    #[error("Send failed: {0}")]
    Transport(String),

    /// The platform answered with a non-success status.
    #[error("Chat platform rejected message ({status}): {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}
