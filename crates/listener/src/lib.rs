//! `compilebot-listener` library crate.
//!
//! The dispatcher proper: request registry, job submission, command
//! handling, and the result poller. The binary entrypoint in `main.rs`
//! wires these to Redis and Discord.

pub mod config;
pub mod handler;
pub mod poller;
pub mod registry;
pub mod shutdown;
pub mod submitter;

pub use handler::{CommandHandler, HandleOutcome};
pub use poller::{DropReason, ResponsePoller, TickOutcome};
pub use registry::RequestRegistry;
pub use submitter::{JobSubmitter, SubmitError};
