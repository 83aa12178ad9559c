//! Discord gateway payload types and parser.
//!
//! Every gateway frame is a JSON object `{"op": <u8>, "d": ..., "s": ..., "t": ...}`.
//! Only the opcodes and dispatch events the bot needs are modelled;
//! everything else parses to [`GatewayEvent::Other`].

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

/// Gateway opcodes.
pub mod opcode {
    pub const DISPATCH: u8 = 0;
    pub const HEARTBEAT: u8 = 1;
    pub const IDENTIFY: u8 = 2;
    pub const RECONNECT: u8 = 7;
    pub const INVALID_SESSION: u8 = 9;
    pub const HELLO: u8 = 10;
    pub const HEARTBEAT_ACK: u8 = 11;
}

/// Gateway intents the bot subscribes to.
pub mod intents {
    pub const GUILD_MESSAGES: u64 = 1 << 9;
    pub const DIRECT_MESSAGES: u64 = 1 << 12;
    pub const MESSAGE_CONTENT: u64 = 1 << 15;

    /// Guild and DM messages, including their text.
    pub const DEFAULT: u64 = GUILD_MESSAGES | DIRECT_MESSAGES | MESSAGE_CONTENT;
}

/// Raw gateway frame.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayPayload {
    pub op: u8,
    #[serde(default)]
    pub d: serde_json::Value,
    #[serde(default)]
    pub s: Option<u64>,
    #[serde(default)]
    pub t: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct HelloData {
    heartbeat_interval: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct ReadyData {
    user: Author,
}

/// Author of a message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Author {
    pub id: String,
    #[serde(default)]
    pub bot: bool,
}

/// Payload of a `MESSAGE_CREATE` dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageCreate {
    pub channel_id: String,
    pub author: Author,
    #[serde(default)]
    pub content: String,
}

/// A gateway frame reduced to what the session loop acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    /// First frame after connecting; carries the heartbeat period.
    Hello { heartbeat_interval: Duration },
    /// Identify accepted. `user_id` is the bot's own account.
    Ready { user_id: String },
    MessageCreate(MessageCreate),
    HeartbeatAck,
    /// The server asks for an immediate heartbeat.
    HeartbeatRequest,
    /// The server asks the client to reconnect.
    Reconnect,
    InvalidSession,
    /// Any dispatch or opcode the bot does not use.
    Other,
}

/// A parsed frame plus its sequence number, if it carried one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFrame {
    pub sequence: Option<u64>,
    pub event: GatewayEvent,
}

/// Parse a text frame from the gateway.
pub fn parse_frame(text: &str) -> Result<ParsedFrame, serde_json::Error> {
    let payload: GatewayPayload = serde_json::from_str(text)?;
    let event = match payload.op {
        opcode::HELLO => {
            let hello: HelloData = serde_json::from_value(payload.d)?;
            GatewayEvent::Hello {
                heartbeat_interval: Duration::from_millis(hello.heartbeat_interval),
            }
        }
        opcode::DISPATCH => match payload.t.as_deref() {
            Some("READY") => {
                let ready: ReadyData = serde_json::from_value(payload.d)?;
                GatewayEvent::Ready {
                    user_id: ready.user.id,
                }
            }
            Some("MESSAGE_CREATE") => GatewayEvent::MessageCreate(serde_json::from_value(payload.d)?),
            _ => GatewayEvent::Other,
        },
        opcode::HEARTBEAT_ACK => GatewayEvent::HeartbeatAck,
        opcode::HEARTBEAT => GatewayEvent::HeartbeatRequest,
        opcode::RECONNECT => GatewayEvent::Reconnect,
        opcode::INVALID_SESSION => GatewayEvent::InvalidSession,
        _ => GatewayEvent::Other,
    };

    Ok(ParsedFrame {
        sequence: payload.s,
        event,
    })
}

/// Identify frame sent once per session after Hello.
pub fn identify(token: &str, intents: u64) -> String {
    json!({
        "op": opcode::IDENTIFY,
        "d": {
            "token": token,
            "intents": intents,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "compilebot",
                "device": "compilebot",
            },
        },
    })
    .to_string()
}

/// Heartbeat frame carrying the last sequence number seen.
pub fn heartbeat(sequence: Option<u64>) -> String {
    json!({ "op": opcode::HEARTBEAT, "d": sequence }).to_string()
}

/// Close codes after which reconnecting cannot succeed (bad token,
/// invalid or disallowed intents, unsupported API version).
pub fn is_fatal_close_code(code: u16) -> bool {
    matches!(code, 4004 | 4010 | 4011 | 4012 | 4013 | 4014)
}
