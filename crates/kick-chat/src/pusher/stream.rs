use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::protocol::Message,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::channel::ChannelIdentity;
use crate::error::Result;
use crate::message::InboundMessage;

use super::session::{ConnectionState, PusherSession, SessionAction};

/// Kick's public Pusher application key.
pub const KICK_PUSHER_KEY: &str = "32cbd69e4b950bf97679";

/// Kick's Pusher cluster.
pub const KICK_PUSHER_CLUSTER: &str = "us2";

/// Fixed wait between an abnormal close and the next connection attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket URL of a Pusher app, using the same client/version Kick's web client sends.
pub fn pusher_url(cluster: &str, key: &str) -> String {
    format!(
        "wss://ws-{cluster}.pusher.com/app/{key}?protocol=7&client=js&version=7.6.0&flash=false"
    )
}

#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// WebSocket endpoint
    pub url: String,
    /// Wait before reconnecting after an abnormal close
    pub reconnect_delay: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: pusher_url(KICK_PUSHER_CLUSTER, KICK_PUSHER_KEY),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

/// How a single connection ended.
#[derive(Debug, PartialEq)]
enum ConnectionOutcome {
    Closed,
    Reconnect,
    Cancelled,
    ReceiverGone,
}

/// Persistent chat stream for one chatroom.
///
/// One task drives [`StreamClient::run`]; every frame of a connection is read,
/// decoded and answered on that task, so chat messages leave in the order they
/// arrived.
pub struct StreamClient {
    identity: Arc<ChannelIdentity>,
    config: StreamConfig,
    state_tx: watch::Sender<ConnectionState>,
}

impl StreamClient {
    pub fn new(identity: Arc<ChannelIdentity>, config: StreamConfig) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Connecting);
        Self {
            identity,
            config,
            state_tx,
        }
    }

    /// Observe state transitions.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    fn publish_state(&self, state: ConnectionState) {
        self.state_tx.send_replace(state);
    }

    /// Run until the server closes normally, the token is cancelled or the
    /// receiver is dropped.
    ///
    /// Abnormal closes and connection failures are retried forever, every
    /// `reconnect_delay`, with the chatroom resolved at startup.
    pub async fn run(
        &self,
        tx: mpsc::Sender<InboundMessage>,
        cancel: CancellationToken,
    ) -> Result<()> {
        let mut session = PusherSession::new(&self.identity);
        let mut attempt: u64 = 0;

        loop {
            self.publish_state(session.state());
            info!(
                "Connecting to {} for chatroom {}",
                self.config.url, self.identity.room_id
            );

            let connect_result = tokio::select! {
                result = connect_async(self.config.url.as_str()) => result,
                _ = cancel.cancelled() => {
                    self.publish_state(ConnectionState::Closing);
                    return Ok(());
                }
            };

            let outcome = match connect_result {
                Ok((ws_stream, _)) => {
                    attempt = 0;
                    session.on_open();
                    self.publish_state(session.state());
                    info!("Connection opened, waiting for handshake");
                    self.drive(ws_stream, &mut session, &tx, &cancel).await
                }
                Err(e) => {
                    warn!("Connection failed: {}", e);
                    session.on_transport_error();
                    ConnectionOutcome::Reconnect
                }
            };

            match outcome {
                ConnectionOutcome::Closed => {
                    self.publish_state(ConnectionState::Closing);
                    info!("Chat stream for chatroom {} closed", self.identity.room_id);
                    return Ok(());
                }
                ConnectionOutcome::Cancelled | ConnectionOutcome::ReceiverGone => {
                    self.publish_state(ConnectionState::Closing);
                    debug!("Chat stream for chatroom {} stopped", self.identity.room_id);
                    return Ok(());
                }
                ConnectionOutcome::Reconnect => {
                    attempt += 1;
                    self.publish_state(ConnectionState::Reconnecting);
                    warn!(
                        attempt,
                        "Unexpected closure, reconnecting to chatroom {} in {:?}",
                        self.identity.room_id,
                        self.config.reconnect_delay
                    );

                    tokio::select! {
                        _ = tokio::time::sleep(self.config.reconnect_delay) => {},
                        _ = cancel.cancelled() => {
                            self.publish_state(ConnectionState::Closing);
                            return Ok(());
                        }
                    }
                    session.restart();
                }
            }
        }
    }

    async fn drive(
        &self,
        mut stream: WsStream,
        session: &mut PusherSession,
        tx: &mpsc::Sender<InboundMessage>,
        cancel: &CancellationToken,
    ) -> ConnectionOutcome {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = stream.close(None).await;
                    return ConnectionOutcome::Cancelled;
                }

                msg_opt = stream.next() => {
                    match msg_opt {
                        Some(Ok(Message::Text(text))) => {
                            match session.on_text(&text) {
                                Ok(SessionAction::Send(frame)) => {
                                    let send_result = match frame.to_message() {
                                        Ok(msg) => stream.send(msg).await.map_err(Into::into),
                                        Err(e) => Err(e),
                                    };
                                    if let Err(e) = send_result {
                                        error!("Failed to send {}: {}", frame.event, e);
                                        session.on_transport_error();
                                        return ConnectionOutcome::Reconnect;
                                    }
                                    self.publish_state(session.state());
                                }
                                Ok(SessionAction::Deliver(message)) => {
                                    if tx.send(message).await.is_err() {
                                        let _ = stream.close(None).await;
                                        return ConnectionOutcome::ReceiverGone;
                                    }
                                }
                                Ok(SessionAction::None) => {}
                                Err(e) => {
                                    warn!("Dropping undecodable frame: {}", e);
                                }
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let state = session.on_close(frame.map(|f| f.code));
                            return if state == ConnectionState::Closing {
                                ConnectionOutcome::Closed
                            } else {
                                ConnectionOutcome::Reconnect
                            };
                        }
                        // tungstenite answers transport-level pings itself
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            error!("WebSocket error: {}", e);
                            session.on_transport_error();
                            return ConnectionOutcome::Reconnect;
                        }
                        None => {
                            session.on_close(None);
                            return ConnectionOutcome::Reconnect;
                        }
                    }
                }
            }
        }
    }
}
