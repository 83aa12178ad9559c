//! Discord adapter for the compilebot dispatcher.
//!
//! Inbound: [`gateway::DiscordGateway`] keeps a WebSocket session to the
//! Discord gateway open, reconnecting with backoff, and forwards every
//! `MESSAGE_CREATE` as an [`InboundMessage`](compilebot_core::InboundMessage).
//!
//! Outbound: [`rest::DiscordRest`] implements
//! [`ChatSender`](compilebot_core::ChatSender) over the REST API.

pub mod gateway;
pub mod messages;
pub mod reconnect;
pub mod rest;

pub use gateway::{DiscordGateway, GatewayError};
pub use rest::DiscordRest;
