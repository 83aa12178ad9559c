//! Domain types shared by the compilebot crates.
//!
//! Zero internal dependencies: the command grammar, request identifiers,
//! the job/response wire model, reply templates, and the chat seam that
//! the gateway adapter implements.

pub mod chat;
pub mod command;
pub mod error;
pub mod job;
pub mod language;
pub mod preview;
pub mod replies;
pub mod request_id;

pub use chat::{ChatSender, InboundMessage, SessionHandle};
pub use command::Command;
pub use error::{CodecError, CommandError};
pub use job::{Job, JobResponse};
pub use language::LanguageAllowList;
pub use preview::log_preview;
pub use request_id::RequestId;
