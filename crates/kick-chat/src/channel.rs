//! Channel lookup.
//!
//! Turns a channel slug (or a `kick.com/<slug>` URL) into the numeric chatroom
//! id the chat stream is scoped by. The lookup is a single HTTP request with no
//! retry. When Kick blocks or rejects it, an operator-supplied chatroom id can
//! be used instead.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::{Client, StatusCode, header};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{KickError, Result};
use crate::http::{DEFAULT_TIMEOUT, KICK_BASE_URL};

pub static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.)?kick\.com/([A-Za-z0-9_-]+)/?(?:[?#].*)?$").unwrap()
});

static SLUG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

/// A resolved channel. Created once at startup and shared read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelIdentity {
    /// Channel slug as used in URLs
    pub slug: String,
    /// Chatroom id the chat subscription and outbound posts are scoped by
    pub room_id: u64,
    /// Broadcaster user id (only known when the lookup succeeded)
    pub broadcaster_id: Option<u64>,
    /// Broadcaster display name (only known when the lookup succeeded)
    pub display_name: Option<String>,
}

impl ChannelIdentity {
    /// Identity built from a manually configured chatroom id.
    pub fn manual(slug: impl Into<String>, room_id: u64) -> Self {
        Self {
            slug: slug.into(),
            room_id,
            broadcaster_id: None,
            display_name: None,
        }
    }

    /// Name of the Pusher channel carrying this room's chat events.
    pub fn chat_channel(&self) -> String {
        format!("chatrooms.{}.v2", self.room_id)
    }
}

/// Extract a channel slug from either a bare slug or a channel URL.
pub fn extract_slug(input: &str) -> Option<String> {
    let input = input.trim().trim_start_matches('@');
    if SLUG_REGEX.is_match(input) {
        return Some(input.to_lowercase());
    }
    URL_REGEX
        .captures(input)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase())
}

#[derive(Debug, Deserialize)]
struct ChannelResponse {
    #[serde(default)]
    chatroom: Option<ChatroomInfo>,
    #[serde(default)]
    user: Option<UserInfo>,
}

#[derive(Debug, Deserialize)]
struct ChatroomInfo {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    username: Option<String>,
}

/// Settings for [`ChannelResolver`].
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Base URL of the Kick API
    pub api_base: String,
    /// Chatroom id to use when the lookup is blocked or fails
    pub manual_room_id: Option<u64>,
    /// Timeout of the single lookup request
    pub timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            api_base: KICK_BASE_URL.to_string(),
            manual_room_id: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ResolverConfig {
    pub fn with_manual_room_id(mut self, room_id: Option<u64>) -> Self {
        self.manual_room_id = room_id;
        self
    }
}

pub struct ChannelResolver {
    client: Client,
    config: ResolverConfig,
}

impl ChannelResolver {
    pub fn new(client: Client, config: ResolverConfig) -> Self {
        Self { client, config }
    }

    /// Resolve a channel identifier into a [`ChannelIdentity`].
    ///
    /// Lookup failures (403, 404, 429, unreachable) fall back to the manual
    /// chatroom id when one is configured. Any other failure is returned as is.
    pub async fn resolve(&self, channel: &str) -> Result<ChannelIdentity> {
        let slug = extract_slug(channel).ok_or_else(|| KickError::InvalidChannel(channel.into()))?;

        match self.lookup(&slug).await {
            Ok(identity) => {
                info!(
                    "Channel: {} (ID: {:?}), chatroom ID: {}",
                    identity.display_name.as_deref().unwrap_or(&identity.slug),
                    identity.broadcaster_id,
                    identity.room_id
                );
                Ok(identity)
            }
            Err(e) if e.is_lookup_failure() => match self.config.manual_room_id {
                Some(room_id) => {
                    warn!(
                        "Channel lookup for {} failed ({}), using configured chatroom ID {}",
                        slug, e, room_id
                    );
                    Ok(ChannelIdentity::manual(slug, room_id))
                }
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    async fn lookup(&self, slug: &str) -> Result<ChannelIdentity> {
        let url = format!(
            "{}/api/v2/channels/{}",
            self.config.api_base.trim_end_matches('/'),
            slug
        );
        debug!("Looking up channel: {}", url);

        let response = self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/json")
            .header(header::REFERER, format!("{KICK_BASE_URL}/"))
            .header(header::ORIGIN, KICK_BASE_URL)
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| KickError::Unreachable(e.to_string()))?;

        match response.status() {
            StatusCode::FORBIDDEN => return Err(KickError::Forbidden(slug.to_string())),
            StatusCode::NOT_FOUND => return Err(KickError::NotFound(slug.to_string())),
            StatusCode::TOO_MANY_REQUESTS => return Err(KickError::RateLimited(slug.to_string())),
            status if !status.is_success() => {
                return Err(KickError::UnexpectedStatus {
                    status: status.as_u16(),
                    url,
                });
            }
            _ => {}
        }

        let body = response
            .text()
            .await
            .map_err(|e| KickError::Unreachable(e.to_string()))?;
        let data: ChannelResponse = serde_json::from_str(&body)?;

        let chatroom = data
            .chatroom
            .ok_or_else(|| KickError::protocol("channel response has no chatroom.id"))?;
        let (broadcaster_id, display_name) = data
            .user
            .map(|user| (user.id, user.username))
            .unwrap_or_default();

        Ok(ChannelIdentity {
            slug: slug.to_string(),
            room_id: chatroom.id,
            broadcaster_id,
            display_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::default_client;

    fn resolver(server: &mockito::Server, manual_room_id: Option<u64>) -> ChannelResolver {
        let config = ResolverConfig {
            api_base: server.url(),
            ..Default::default()
        }
        .with_manual_room_id(manual_room_id);
        ChannelResolver::new(default_client().unwrap(), config)
    }

    #[test]
    fn test_extract_slug() {
        assert_eq!(extract_slug("xqc"), Some("xqc".to_string()));
        assert_eq!(extract_slug("  @Trainwreckstv "), Some("trainwreckstv".to_string()));
        assert_eq!(
            extract_slug("https://kick.com/Some_Streamer"),
            Some("some_streamer".to_string())
        );
        assert_eq!(extract_slug("kick.com/abc-1/"), Some("abc-1".to_string()));
        assert_eq!(extract_slug("https://www.twitch.tv/xqc"), None);
        assert_eq!(extract_slug("   "), None);
        assert_eq!(extract_slug("a/b"), None);
    }

    #[test]
    fn test_chat_channel_name() {
        let identity = ChannelIdentity::manual("xqc", 668);
        assert_eq!(identity.chat_channel(), "chatrooms.668.v2");
    }

    #[tokio::test]
    async fn test_resolve_from_channel_info() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v2/channels/xqc")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":1,"slug":"xqc","user":{"id":676,"username":"xQc"},"chatroom":{"id":668,"chatable_type":"App\\Models\\Channel"}}"#)
            .expect(1)
            .create_async()
            .await;

        let identity = resolver(&server, None).resolve("xqc").await.unwrap();
        assert_eq!(identity.room_id, 668);
        assert_eq!(identity.broadcaster_id, Some(676));
        assert_eq!(identity.display_name.as_deref(), Some("xQc"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_forbidden_falls_back_to_manual_room() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v2/channels/blocked")
            .with_status(403)
            .expect(1)
            .create_async()
            .await;

        let identity = resolver(&server, Some(42)).resolve("blocked").await.unwrap();
        assert_eq!(identity, ChannelIdentity::manual("blocked", 42));
        // A single attempt, no retry.
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_lookup_errors_without_fallback() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v2/channels/missing")
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v2/channels/busy")
            .with_status(429)
            .create_async()
            .await;

        let resolver = resolver(&server, None);
        assert!(matches!(
            resolver.resolve("missing").await,
            Err(KickError::NotFound(_))
        ));
        assert!(matches!(
            resolver.resolve("busy").await,
            Err(KickError::RateLimited(_))
        ));
    }

    #[tokio::test]
    async fn test_server_error_is_fatal_even_with_fallback() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v2/channels/broken")
            .with_status(500)
            .create_async()
            .await;

        let result = resolver(&server, Some(42)).resolve("broken").await;
        assert!(matches!(
            result,
            Err(KickError::UnexpectedStatus { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_falls_back() {
        let config = ResolverConfig {
            api_base: "http://127.0.0.1:1".to_string(),
            timeout: Duration::from_secs(2),
            manual_room_id: Some(7),
        };
        let resolver = ChannelResolver::new(default_client().unwrap(), config);
        let identity = resolver.resolve("anyone").await.unwrap();
        assert_eq!(identity.room_id, 7);
    }

    #[tokio::test]
    async fn test_missing_chatroom_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v2/channels/odd")
            .with_status(200)
            .with_body(r#"{"user":{"id":1}}"#)
            .create_async()
            .await;

        let result = resolver(&server, Some(1)).resolve("odd").await;
        assert!(matches!(result, Err(KickError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_invalid_channel() {
        let server = mockito::Server::new_async().await;
        let result = resolver(&server, Some(1)).resolve("not a slug").await;
        assert!(matches!(result, Err(KickError::InvalidChannel(_))));
    }
}
