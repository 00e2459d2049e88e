//! Shared HTTP client for the Kick REST endpoints.
//!
//! The same `reqwest::Client` is used for the channel lookup, for posting chat
//! messages and (in `chat-bridge`) for the translation provider, so the
//! connection pool is shared across the whole process.

use std::sync::OnceLock;
use std::time::Duration;

use reqwest::{Client, ClientBuilder};
use tracing::debug;

use crate::error::Result;

/// Browser user agent sent with every request. Kick's API rejects obvious bots.
pub const DEFAULT_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36";

/// Kick web origin, used for the REST API as well as `Origin`/`Referer` headers.
pub const KICK_BASE_URL: &str = "https://kick.com";

/// Upper bound for a single REST call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Another crate installed one first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// A client builder with the defaults every Kick request needs.
pub fn create_client_builder() -> ClientBuilder {
    install_rustls_provider();

    Client::builder()
        .user_agent(DEFAULT_UA)
        .timeout(DEFAULT_TIMEOUT)
        .pool_idle_timeout(Duration::from_secs(90))
}

/// Build the shared client.
pub fn default_client() -> Result<Client> {
    Ok(create_client_builder().build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_client_builds() {
        assert!(default_client().is_ok());
        // Installing twice must be harmless.
        install_rustls_provider();
    }
}
