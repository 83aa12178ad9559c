//! Discord gateway session loop.
//!
//! Connects to the gateway WebSocket, identifies, keeps the heartbeat
//! going, and forwards `MESSAGE_CREATE` events to the dispatcher. Drops
//! and server-requested reconnects are retried with exponential backoff
//! until the [`CancellationToken`] fires or Discord rejects the session
//! with a fatal close code.

use std::time::Duration;

use compilebot_core::{log_preview, InboundMessage};
use futures::{SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::messages::{self, intents, is_fatal_close_code, parse_frame, GatewayEvent};
use crate::reconnect::{next_delay, ReconnectConfig};

/// Gateway endpoint for API v10 with JSON encoding.
pub const DEFAULT_GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";

/// How long to wait for Hello after the socket opens.
const HELLO_TIMEOUT: Duration = Duration::from_secs(30);

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Errors that stop the gateway for good.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Discord closed the session with a code that reconnecting cannot fix.
    #[error("Gateway rejected the session (close code {code}): {reason}")]
    Fatal { code: u16, reason: String },
}

/// How a single gateway session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    Cancelled,
    /// The dispatcher dropped its receiver.
    ReceiverClosed,
    /// Worth reconnecting. `established` is set when READY was seen.
    Reconnect { established: bool },
    Fatal { code: u16, reason: String },
}

/// Per-session bookkeeping.
#[derive(Debug, Default)]
pub struct SessionState {
    /// Last sequence number received, echoed in heartbeats.
    pub sequence: Option<u64>,
    /// The bot's own user id, known after READY.
    pub self_id: Option<String>,
    /// A heartbeat went out and no ACK has arrived yet.
    pub awaiting_ack: bool,
}

impl SessionState {
    fn reconnect(&self) -> SessionEnd {
        SessionEnd::Reconnect {
            established: self.self_id.is_some(),
        }
    }
}

/// Long-lived connection to the Discord gateway.
pub struct DiscordGateway {
    token: String,
    url: String,
    intents: u64,
    reconnect: ReconnectConfig,
}

impl DiscordGateway {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            url: DEFAULT_GATEWAY_URL.to_string(),
            intents: intents::DEFAULT,
            reconnect: ReconnectConfig::default(),
        }
    }

    /// Point the gateway at a different endpoint.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Run sessions until cancelled, reconnecting as needed.
    ///
    /// Returns `Ok(())` on cancellation or when `events` has no receiver
    /// left, and an error only for fatal close codes.
    pub async fn run(
        &self,
        events: mpsc::Sender<InboundMessage>,
        cancel: CancellationToken,
    ) -> Result<(), GatewayError> {
        let mut delay = self.reconnect.initial_delay;
        let mut attempt = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Ok(());
            }

            attempt += 1;
            tracing::info!(url = %self.url, attempt, "Connecting to Discord gateway");

            let connected = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                result = connect_async(self.url.as_str()) => result,
            };

            match connected {
                Ok((ws_stream, _response)) => {
                    tracing::info!("Discord gateway connected");
                    match self.run_session(ws_stream, &events, &cancel).await {
                        SessionEnd::Cancelled | SessionEnd::ReceiverClosed => return Ok(()),
                        SessionEnd::Fatal { code, reason } => {
                            return Err(GatewayError::Fatal { code, reason });
                        }
                        SessionEnd::Reconnect { established } => {
                            if established {
                                delay = self.reconnect.initial_delay;
                                attempt = 0;
                            }
                            tracing::warn!("Gateway session ended, reconnecting");
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, attempt, "Gateway connection failed");
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(delay) => {}
            }

            delay = next_delay(delay, &self.reconnect);
        }
    }

    /// Drive one session: Hello, Identify, then heartbeats and dispatches
    /// via `tokio::select!` until the socket drops or we are cancelled.
    async fn run_session(
        &self,
        ws_stream: WsStream,
        events: &mpsc::Sender<InboundMessage>,
        cancel: &CancellationToken,
    ) -> SessionEnd {
        let (mut sink, mut stream) = ws_stream.split();

        let heartbeat_interval =
            match tokio::time::timeout(HELLO_TIMEOUT, wait_for_hello(&mut stream)).await {
                Ok(Some(interval)) => interval,
                Ok(None) => {
                    tracing::warn!("Gateway closed before Hello");
                    return SessionEnd::Reconnect { established: false };
                }
                Err(_) => {
                    tracing::warn!(timeout_secs = HELLO_TIMEOUT.as_secs(), "No Hello from gateway");
                    return SessionEnd::Reconnect { established: false };
                }
            };

        tracing::debug!(
            heartbeat_ms = heartbeat_interval.as_millis() as u64,
            "Received Hello, identifying"
        );

        if let Err(e) = sink
            .send(Message::Text(messages::identify(&self.token, self.intents)))
            .await
        {
            tracing::error!(error = %e, "Failed to send Identify");
            return SessionEnd::Reconnect { established: false };
        }

        let mut ticker = tokio::time::interval(heartbeat_interval);
        // The first tick completes immediately.
        ticker.tick().await;

        let mut state = SessionState::default();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = sink.send(Message::Close(None)).await;
                    return SessionEnd::Cancelled;
                }
                _ = ticker.tick() => {
                    if state.awaiting_ack {
                        tracing::warn!("Heartbeat not acknowledged, dropping session");
                        return state.reconnect();
                    }
                    if let Err(e) = sink.send(Message::Text(messages::heartbeat(state.sequence))).await {
                        tracing::error!(error = %e, "Failed to send heartbeat");
                        return state.reconnect();
                    }
                    state.awaiting_ack = true;
                }
                msg = stream.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(end) = handle_frame(&text, &mut state, &mut sink, events).await {
                                return end;
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            if let Some(frame) = &frame {
                                let code = u16::from(frame.code);
                                if is_fatal_close_code(code) {
                                    return SessionEnd::Fatal {
                                        code,
                                        reason: frame.reason.to_string(),
                                    };
                                }
                            }
                            tracing::info!(?frame, "Gateway closed the connection");
                            return state.reconnect();
                        }
                        Some(Ok(_)) => {
                            // Ping/Pong are answered by tungstenite; binary frames are unused.
                        }
                        Some(Err(e)) => {
                            tracing::error!(error = %e, "Gateway receive error");
                            return state.reconnect();
                        }
                        None => {
                            tracing::info!("Gateway stream exhausted");
                            return state.reconnect();
                        }
                    }
                }
            }
        }
    }
}

/// Read frames until Hello arrives. `None` if the stream ends first.
pub async fn wait_for_hello<S>(stream: &mut S) -> Option<Duration>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => match parse_frame(&text) {
                Ok(frame) => {
                    if let GatewayEvent::Hello { heartbeat_interval } = frame.event {
                        return Some(heartbeat_interval);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        bytes = text.len(),
                        preview = log_preview(&text),
                        "Malformed gateway frame"
                    );
                }
            },
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => {}
        }
    }
    None
}

/// Apply one text frame to the session. Returns `Some` when the session
/// must end.
pub async fn handle_frame<S>(
    text: &str,
    state: &mut SessionState,
    sink: &mut S,
    events: &mpsc::Sender<InboundMessage>,
) -> Option<SessionEnd>
where
    S: SinkExt<Message, Error = tungstenite::Error> + Unpin,
{
    let frame = match parse_frame(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!(
                error = %e,
                bytes = text.len(),
                preview = log_preview(text),
                "Malformed gateway frame"
            );
            return None;
        }
    };

    if let Some(sequence) = frame.sequence {
        state.sequence = Some(sequence);
    }

    match frame.event {
        GatewayEvent::Ready { user_id } => {
            tracing::info!(user_id = %user_id, "Gateway session ready");
            state.self_id = Some(user_id);
            None
        }
        GatewayEvent::MessageCreate(message) => {
            let from_self = state.self_id.as_deref() == Some(message.author.id.as_str());
            let inbound = InboundMessage {
                channel_id: message.channel_id,
                author_id: message.author.id,
                content: message.content,
                from_self,
            };
            if events.send(inbound).await.is_err() {
                tracing::info!("Message receiver dropped, ending gateway session");
                return Some(SessionEnd::ReceiverClosed);
            }
            None
        }
        GatewayEvent::HeartbeatAck => {
            state.awaiting_ack = false;
            None
        }
        GatewayEvent::HeartbeatRequest => {
            if let Err(e) = sink
                .send(Message::Text(messages::heartbeat(state.sequence)))
                .await
            {
                tracing::error!(error = %e, "Failed to answer heartbeat request");
                return Some(state.reconnect());
            }
            None
        }
        GatewayEvent::Reconnect => {
            tracing::info!("Gateway requested reconnect");
            Some(state.reconnect())
        }
        GatewayEvent::InvalidSession => {
            tracing::warn!("Gateway invalidated the session");
            Some(state.reconnect())
        }
        GatewayEvent::Hello { .. } | GatewayEvent::Other => None,
    }
}
