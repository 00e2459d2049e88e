//! Kick chat client.
//!
//! ## Core Types
//!
//! - [`ChannelResolver`] - Resolve a channel slug into its chatroom id
//! - [`StreamClient`] - Persistent Pusher connection delivering [`InboundMessage`]s
//! - [`Publisher`] - Post messages back into the chatroom
//!
//! The stream client keeps reconnecting after abnormal closures, with the
//! [`ChannelIdentity`] resolved once at startup.

pub mod channel;
pub mod error;
pub mod http;
pub mod message;
pub mod publisher;
pub mod pusher;

pub use channel::{ChannelIdentity, ChannelResolver, ResolverConfig, extract_slug};
pub use error::{KickError, Result};
pub use http::{create_client_builder, default_client, install_rustls_provider};
pub use message::InboundMessage;
pub use publisher::{Publisher, PublisherConfig};
pub use pusher::{ConnectionState, StreamClient, StreamConfig};
