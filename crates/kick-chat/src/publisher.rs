//! Posting messages back into the chatroom.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode, header};
use serde::Serialize;
use tracing::{info, warn};

use crate::channel::ChannelIdentity;
use crate::error::{KickError, Result};
use crate::http::{DEFAULT_TIMEOUT, KICK_BASE_URL};

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    content: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Base URL of the Kick API
    pub api_base: String,
    pub timeout: Duration,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            api_base: KICK_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Sends chat messages as the bot account.
///
/// Without a credential the publisher runs in dry-run mode: messages are only
/// logged and [`Publisher::publish`] reports `false`.
pub struct Publisher {
    client: Client,
    identity: Arc<ChannelIdentity>,
    credential: Option<String>,
    config: PublisherConfig,
}

impl Publisher {
    pub fn new(
        client: Client,
        identity: Arc<ChannelIdentity>,
        credential: Option<String>,
        config: PublisherConfig,
    ) -> Self {
        let credential = credential
            .map(|token| token.trim().trim_start_matches("Bearer ").to_string())
            .filter(|token| !token.is_empty());
        Self {
            client,
            identity,
            credential,
            config,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.credential.is_none()
    }

    /// Post `text` to the chatroom. Returns whether Kick accepted it.
    ///
    /// Failures are logged and never retried.
    pub async fn publish(&self, text: &str) -> bool {
        let Some(token) = self.credential.as_deref() else {
            info!("[dry-run] {}", text);
            return false;
        };

        match self.send(token, text).await {
            Ok(()) => {
                info!("Translation sent: {}", text);
                true
            }
            Err(e) => {
                warn!(
                    "Failed to send message to chatroom {}: {}",
                    self.identity.room_id, e
                );
                false
            }
        }
    }

    async fn send(&self, token: &str, text: &str) -> Result<()> {
        let url = format!(
            "{}/api/v2/messages/send/{}",
            self.config.api_base.trim_end_matches('/'),
            self.identity.room_id
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header(header::ACCEPT, "application/json")
            .header(header::ORIGIN, KICK_BASE_URL)
            .header(
                header::REFERER,
                format!("{}/{}", KICK_BASE_URL, self.identity.slug),
            )
            .json(&SendMessageRequest {
                content: text,
                kind: "message",
            })
            .timeout(self.config.timeout)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::OK {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(KickError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
