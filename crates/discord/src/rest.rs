//! Discord REST client for posting channel messages.

use std::time::Duration;

use async_trait::async_trait;
use compilebot_core::chat::{ChatError, ChatSender};
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde::Deserialize;

/// Base URL of the v10 REST API.
pub const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Discord's maximum message content length in characters.
pub const MAX_MESSAGE_LEN: usize = 2000;

/// Maximum attempts for a rate-limited send.
const MAX_RETRIES: u32 = 3;

/// Cap on how long a single rate-limit wait may be.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(10);

/// Body of a 429 response.
#[derive(Debug, Deserialize)]
struct RateLimited {
    retry_after: f64,
}

/// Posts messages as the bot user.
#[derive(Clone)]
pub struct DiscordRest {
    client: reqwest::Client,
    api_base: String,
    token: String,
}

impl DiscordRest {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), DISCORD_API_BASE, token)
    }

    /// Reuse an existing [`reqwest::Client`] and API base URL.
    pub fn with_client(
        client: reqwest::Client,
        api_base: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            token: token.into(),
        }
    }

    fn messages_url(&self, channel_id: &str) -> String {
        format!("{}/channels/{}/messages", self.api_base, channel_id)
    }
}

impl std::fmt::Debug for DiscordRest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordRest")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ChatSender for DiscordRest {
    /// Send `content` to a channel, truncated to [`MAX_MESSAGE_LEN`].
    ///
    /// Rate-limited requests are retried after the server-provided delay.
    async fn send_message(&self, channel_id: &str, content: &str) -> Result<(), ChatError> {
        let body = serde_json::json!({ "content": truncate(content) });
        let url = self.messages_url(channel_id);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let response = self
                .client
                .post(&url)
                .header(AUTHORIZATION, format!("Bot {}", self.token))
                .json(&body)
                .send()
                .await
                .map_err(|e| ChatError::Transport(e.to_string()))?;

            let status = response.status();
            if status.is_success() {
                return Ok(());
            }

            let text = response.text().await.unwrap_or_default();

            if status == StatusCode::TOO_MANY_REQUESTS && attempt < MAX_RETRIES {
                let wait = retry_after(&text);
                tracing::warn!(
                    channel_id,
                    attempt,
                    wait_ms = wait.as_millis() as u64,
                    "Rate limited by Discord, retrying"
                );
                tokio::time::sleep(wait).await;
                continue;
            }

            return Err(ChatError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }
    }
}

/// Truncate to at most [`MAX_MESSAGE_LEN`] characters.
pub fn truncate(content: &str) -> &str {
    match content.char_indices().nth(MAX_MESSAGE_LEN) {
        Some((idx, _)) => &content[..idx],
        None => content,
    }
}

/// Delay requested by a 429 body, defaulting to one second.
fn retry_after(body: &str) -> Duration {
    serde_json::from_str::<RateLimited>(body)
        .ok()
        .and_then(|r| Duration::try_from_secs_f64(r.retry_after).ok())
        .unwrap_or(Duration::from_secs(1))
        .min(MAX_RETRY_AFTER)
}
