//! User-visible chat replies.
//!
//! Wording is relied upon by users and existing tooling; keep it verbatim.

use crate::request_id::RequestId;

/// Reply to a command that does not match the expected shape.
///
/// The backticks are escaped so the chat client shows them literally.
pub const INVALID_SYNTAX: &str =
    "Invalid syntax. +compilebot <language> \\`\\`\\`<code>\\`\\`\\`";

/// Reply when the code block could not be extracted.
pub const ERROR_PARSING_CODE: &str = "Error parsing code.";

/// Reply when the job could not be serialized.
pub const ERROR_ENCODE_JOB: &str = "Error: EncodeJob.";

/// Reply when the job could not be pushed onto the queue.
pub const ERROR_JOB_QUEUE: &str = "Error: JobQueue.";

pub fn working_on(request_id: &RequestId) -> String {
    format!("Working on request: {request_id}")
}

pub fn not_supported(language: &str) -> String {
    format!("{language} not supported.")
}

/// Execution output, fenced as a code block.
pub fn output_for(request_id: &RequestId, response: &str) -> String {
    format!("Output for: {request_id}\n```{response}```")
}
