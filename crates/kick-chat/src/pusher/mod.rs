//! Pusher protocol client for Kick chat.

pub mod frame;
pub mod session;
pub mod stream;

pub use frame::{PusherEvent, PusherFrame};
pub use session::{ConnectionState, PusherSession, SessionAction};
pub use stream::{StreamClient, StreamConfig, pusher_url};
