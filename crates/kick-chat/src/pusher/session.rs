//! Connection state machine for one Pusher session.
//!
//! The session owns the [`ConnectionState`] and decides, for every transport
//! event, what the read loop has to do next. It never touches the socket, which
//! keeps every transition testable without a network.

use std::fmt;

use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tracing::{debug, info, trace, warn};

use crate::channel::ChannelIdentity;
use crate::error::Result;
use crate::message::InboundMessage;

use super::frame::{PusherEvent, PusherFrame};

/// Lifecycle of the chat connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Connecting,
    AwaitingHandshake,
    Subscribed,
    /// Closed normally. Terminal.
    Closing,
    /// Closed abnormally; a new connection follows after the backoff.
    Reconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::AwaitingHandshake => "awaiting-handshake",
            Self::Subscribed => "subscribed",
            Self::Closing => "closing",
            Self::Reconnecting => "reconnecting",
        };
        f.write_str(name)
    }
}

/// What the read loop must do after an inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    /// Write this frame to the socket right away.
    Send(PusherFrame),
    /// Hand this chat message downstream.
    Deliver(InboundMessage),
    None,
}

pub struct PusherSession {
    channel: String,
    state: ConnectionState,
    socket_id: Option<String>,
}

impl PusherSession {
    pub fn new(identity: &ChannelIdentity) -> Self {
        Self {
            channel: identity.chat_channel(),
            state: ConnectionState::Connecting,
            socket_id: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn socket_id(&self) -> Option<&str> {
        self.socket_id.as_deref()
    }

    /// The transport finished its upgrade.
    pub fn on_open(&mut self) {
        self.state = ConnectionState::AwaitingHandshake;
    }

    /// Decode a text frame and feed it into the state machine.
    pub fn on_text(&mut self, text: &str) -> Result<SessionAction> {
        let frame = PusherFrame::parse(text)?;
        let event = PusherEvent::decode(&frame)?;
        Ok(self.on_event(event))
    }

    pub fn on_event(&mut self, event: PusherEvent) -> SessionAction {
        match event {
            PusherEvent::ConnectionEstablished { socket_id, .. } => {
                if self.state != ConnectionState::AwaitingHandshake {
                    debug!("Ignoring handshake while {}", self.state);
                    return SessionAction::None;
                }
                info!("Handshake complete (socket {}), subscribing to {}", socket_id, self.channel);
                self.socket_id = Some(socket_id);
                self.state = ConnectionState::Subscribed;
                SessionAction::Send(PusherFrame::subscribe(&self.channel))
            }
            PusherEvent::Ping => match self.state {
                ConnectionState::AwaitingHandshake | ConnectionState::Subscribed => {
                    trace!("Ping received, sending pong");
                    SessionAction::Send(PusherFrame::pong())
                }
                _ => SessionAction::None,
            },
            PusherEvent::ChatMessage(message) => {
                if self.state == ConnectionState::Subscribed {
                    SessionAction::Deliver(message)
                } else {
                    debug!("Dropping chat message received while {}", self.state);
                    SessionAction::None
                }
            }
            PusherEvent::SubscriptionSucceeded { channel } => {
                info!(
                    "Subscribed to {}",
                    channel.as_deref().unwrap_or(&self.channel)
                );
                SessionAction::None
            }
            PusherEvent::Error { code, message } => {
                warn!(
                    "Pusher error {:?}: {}",
                    code,
                    message.as_deref().unwrap_or("no message")
                );
                SessionAction::None
            }
            PusherEvent::Unknown(event) => {
                trace!("Ignoring event {}", event);
                SessionAction::None
            }
        }
    }

    /// The transport closed. `None` means the stream ended without a close
    /// frame, which is reported the same way as 1006.
    pub fn on_close(&mut self, code: Option<CloseCode>) -> ConnectionState {
        let code = code.unwrap_or(CloseCode::Abnormal);
        self.state = if code == CloseCode::Normal {
            ConnectionState::Closing
        } else {
            ConnectionState::Reconnecting
        };
        info!("Connection closed with code {}, now {}", u16::from(code), self.state);
        self.state
    }

    pub fn on_transport_error(&mut self) -> ConnectionState {
        self.state = ConnectionState::Reconnecting;
        self.state
    }

    /// Start over for a new connection attempt on the same chatroom.
    pub fn restart(&mut self) {
        self.state = ConnectionState::Connecting;
        self.socket_id = None;
    }
}
