//! Pusher protocol 7 frames.
//!
//! Every frame is a JSON object with an `event` name and a `data` field. Inbound
//! `data` is usually JSON encoded as a string; some system events carry a plain
//! object instead, so both forms are accepted.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::error::Result;
use crate::message::InboundMessage;

pub const CONNECTION_ESTABLISHED: &str = "pusher:connection_established";
pub const PING: &str = "pusher:ping";
pub const PONG: &str = "pusher:pong";
pub const SUBSCRIBE: &str = "pusher:subscribe";
pub const ERROR: &str = "pusher:error";
pub const SUBSCRIPTION_SUCCEEDED: &str = "pusher_internal:subscription_succeeded";
pub const CHAT_MESSAGE: &str = r"App\Events\ChatMessageEvent";

/// A raw Pusher frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PusherFrame {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

impl PusherFrame {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Decode the `data` field, unwrapping the string encoding if needed.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T> {
        match &self.data {
            serde_json::Value::String(encoded) => Ok(serde_json::from_str(encoded)?),
            other => Ok(T::deserialize(other)?),
        }
    }

    /// Subscription request for a public channel.
    pub fn subscribe(channel: &str) -> Self {
        Self {
            event: SUBSCRIBE.to_string(),
            data: json!({ "auth": "", "channel": channel }),
            channel: None,
        }
    }

    pub fn pong() -> Self {
        Self {
            event: PONG.to_string(),
            data: json!({}),
            channel: None,
        }
    }

    pub fn to_message(&self) -> Result<Message> {
        Ok(Message::Text(serde_json::to_string(self)?.into()))
    }
}

#[derive(Debug, Deserialize)]
struct ConnectionEstablished {
    socket_id: String,
    #[serde(default)]
    activity_timeout: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct PusherErrorPayload {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessagePayload {
    #[serde(default)]
    id: Option<String>,
    content: String,
    sender: ChatSender,
}

#[derive(Debug, Deserialize)]
struct ChatSender {
    username: String,
}

/// Typed view of the events the stream client reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum PusherEvent {
    ConnectionEstablished {
        socket_id: String,
        activity_timeout: Option<u64>,
    },
    Ping,
    SubscriptionSucceeded {
        channel: Option<String>,
    },
    Error {
        code: Option<u16>,
        message: Option<String>,
    },
    ChatMessage(InboundMessage),
    /// Any event this client has no use for.
    Unknown(String),
}

impl PusherEvent {
    pub fn decode(frame: &PusherFrame) -> Result<Self> {
        let event = match frame.event.as_str() {
            CONNECTION_ESTABLISHED => {
                let payload: ConnectionEstablished = frame.payload()?;
                Self::ConnectionEstablished {
                    socket_id: payload.socket_id,
                    activity_timeout: payload.activity_timeout,
                }
            }
            PING => Self::Ping,
            SUBSCRIPTION_SUCCEEDED => Self::SubscriptionSucceeded {
                channel: frame.channel.clone(),
            },
            ERROR => {
                let payload: PusherErrorPayload = frame.payload().unwrap_or(PusherErrorPayload {
                    code: None,
                    message: None,
                });
                Self::Error {
                    code: payload.code,
                    message: payload.message,
                }
            }
            CHAT_MESSAGE => {
                let payload: ChatMessagePayload = frame.payload()?;
                let message = InboundMessage::new(payload.sender.username, payload.content);
                Self::ChatMessage(match payload.id {
                    Some(id) => message.with_id(id),
                    None => message,
                })
            }
            other => Self::Unknown(other.to_string()),
        };
        Ok(event)
    }
}
