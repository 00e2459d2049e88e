//! Kick chat error types.

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, KickError>;

/// Errors that can occur while talking to Kick.
#[derive(Error, Debug)]
pub enum KickError {
    /// The channel lookup answered 404.
    #[error("channel not found: {0}")]
    NotFound(String),

    /// The channel lookup answered 403 (usually a bot-protection block).
    #[error("access forbidden while looking up channel {0}")]
    Forbidden(String),

    /// The channel lookup answered 429.
    #[error("rate limited while looking up channel {0}")]
    RateLimited(String),

    /// The channel lookup could not reach the server or timed out.
    #[error("channel lookup unreachable: {0}")]
    Unreachable(String),

    /// A non-2xx status that has no dedicated handling.
    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// The server refused a chat message.
    #[error("message rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The channel identifier cannot be used to build a request.
    #[error("invalid channel: {0}")]
    InvalidChannel(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("websocket error: {0}")]
    WebSocket(Box<tungstenite::Error>),

    /// Protocol parsing/encoding errors
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl From<tungstenite::Error> for KickError {
    fn from(error: tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(error))
    }
}

impl KickError {
    /// Create a protocol error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Whether this is one of the lookup failures that may fall back to a
    /// manually configured chatroom id.
    pub fn is_lookup_failure(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::Forbidden(_) | Self::RateLimited(_) | Self::Unreachable(_)
        )
    }
}
