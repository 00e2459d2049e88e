//! Chat message types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat message received from the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Message id assigned by Kick, when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Sender username
    pub username: String,
    /// Message content as sent, emote markup included
    pub raw_text: String,
    /// Time the frame was decoded
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    pub fn new(username: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self {
            message_id: None,
            username: username.into(),
            raw_text: raw_text.into(),
            received_at: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }
}
