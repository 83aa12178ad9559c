//! Wire model for the job and result queues.
//!
//! The two payloads use different field casing and both must be kept
//! as-is for the external execution worker:
//!
//! | Payload  | Fields                                                         |
//! |----------|----------------------------------------------------------------|
//! | Job      | `channelID`, `code`, `language`, `requestID`                   |
//! | Response | `ChannelID`, `Code`, `Language`, `RequestID`, `Response`       |

use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::request_id::RequestId;

/// A code-execution request pushed onto the job queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    #[serde(rename = "channelID")]
    pub channel_id: String,
    pub code: String,
    pub language: String,
    #[serde(rename = "requestID")]
    pub request_id: RequestId,
}

/// The worker's answer to a [`Job`], read from the result queue.
///
/// `Code` and `Language` are echoed back by the worker and may be omitted.
/// Lower-camel aliases are accepted because some workers reuse the job
/// field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResponse {
    #[serde(rename = "ChannelID", alias = "channelID")]
    pub channel_id: String,
    #[serde(rename = "Code", alias = "code", default)]
    pub code: String,
    #[serde(rename = "Language", alias = "language", default)]
    pub language: String,
    #[serde(rename = "RequestID", alias = "requestID")]
    pub request_id: RequestId,
    #[serde(rename = "Response", alias = "response")]
    pub response: String,
}

/// Serialize a job into its queue item form.
pub fn encode_job(job: &Job) -> Result<String, CodecError> {
    serde_json::to_string(job).map_err(CodecError::Encode)
}

/// Parse a result queue item.
pub fn decode_response(item: &str) -> Result<JobResponse, CodecError> {
    serde_json::from_str(item).map_err(CodecError::Decode)
}
