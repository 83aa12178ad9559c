/// Failures while reading a `+compilebot` command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// The message is not `+compilebot`, a language word, then a fenced block.
    #[error("Invalid command syntax")]
    Syntax,

    /// No complete fenced code block could be located in the message.
    #[error("Could not extract fenced code block")]
    Extraction,
}

/// Failures while converting between domain records and queue items.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// A job could not be serialized.
    #[error("Failed to encode job: {0}")]
    Encode(#[source] serde_json::Error),

    /// A queue item was not a valid response payload.
    #[error("Failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),
}
