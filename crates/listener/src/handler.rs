//! Inbound command path: message → validation → registration → job.

use std::sync::Arc;
use std::time::Duration;

use compilebot_core::{
    command, replies, CommandError, InboundMessage, LanguageAllowList, RequestId, SessionHandle,
};

use crate::registry::RequestRegistry;
use crate::submitter::{JobSubmitter, SubmitError};

/// Default bound on a single chat reply.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleOutcome {
    /// Not addressed to the bot, or authored by it. No reply.
    Ignored,
    InvalidSyntax,
    UnsupportedLanguage(String),
    /// The fenced block could not be extracted.
    ExtractionFailed,
    /// Registered and enqueued.
    Submitted(RequestId),
    /// Registered, but the job never reached the queue.
    SubmitFailed(RequestId),
}

/// Handles `+compilebot` commands.
///
/// Every failure is turned into a chat reply; nothing propagates to the
/// caller.
pub struct CommandHandler {
    languages: LanguageAllowList,
    registry: Arc<RequestRegistry>,
    submitter: JobSubmitter,
    send_timeout: Duration,
}

impl CommandHandler {
    pub fn new(
        languages: LanguageAllowList,
        registry: Arc<RequestRegistry>,
        submitter: JobSubmitter,
    ) -> Self {
        Self {
            languages,
            registry,
            submitter,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    /// Process one message. `session` is the reply capability for the
    /// channel the message came from; it is stored against the new
    /// request id so the poller can answer later.
    pub async fn handle(&self, message: &InboundMessage, session: &SessionHandle) -> HandleOutcome {
        if message.from_self || !command::is_command(&message.content) {
            return HandleOutcome::Ignored;
        }

        let channel_id = message.channel_id.as_str();

        let cmd = match command::parse(&message.content) {
            Ok(cmd) => cmd,
            Err(CommandError::Syntax) => {
                tracing::debug!(channel_id, "Invalid command syntax");
                self.reply(session, channel_id, replies::INVALID_SYNTAX).await;
                return HandleOutcome::InvalidSyntax;
            }
            Err(e @ CommandError::Extraction) => {
                tracing::warn!(channel_id, error = %e, "Error parsing code");
                self.reply(session, channel_id, replies::ERROR_PARSING_CODE).await;
                return HandleOutcome::ExtractionFailed;
            }
        };

        if !self.languages.contains(&cmd.language) {
            tracing::debug!(channel_id, language = %cmd.language, "Unsupported language");
            self.reply(session, channel_id, &replies::not_supported(&cmd.language))
                .await;
            return HandleOutcome::UnsupportedLanguage(cmd.language);
        }

        let request_id = RequestId::generate();
        self.registry
            .register(request_id.clone(), Arc::clone(session))
            .await;
        self.reply(session, channel_id, &replies::working_on(&request_id))
            .await;

        match self
            .submitter
            .submit(&request_id, channel_id, &cmd.code, &cmd.language)
            .await
        {
            Ok(()) => {
                tracing::info!(
                    request_id = %request_id,
                    channel_id,
                    language = %cmd.language,
                    "Job submitted",
                );
                HandleOutcome::Submitted(request_id)
            }
            Err(e) => {
                tracing::warn!(request_id = %request_id, channel_id, error = %e, "Job submission failed");
                let text = match e {
                    SubmitError::Encode(_) => replies::ERROR_ENCODE_JOB,
                    SubmitError::Enqueue(_) | SubmitError::Timeout(_) => replies::ERROR_JOB_QUEUE,
                };
                self.reply(session, channel_id, text).await;
                HandleOutcome::SubmitFailed(request_id)
            }
        }
    }

    /// Send a reply, logging instead of failing.
    async fn reply(&self, session: &SessionHandle, channel_id: &str, text: &str) {
        match tokio::time::timeout(self.send_timeout, session.send_message(channel_id, text)).await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(channel_id, error = %e, "Failed to send reply");
            }
            Err(_) => {
                tracing::warn!(
                    channel_id,
                    timeout_ms = self.send_timeout.as_millis() as u64,
                    "Reply timed out",
                );
            }
        }
    }
}
