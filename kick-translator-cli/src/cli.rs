use std::time::Duration;

use chat_bridge::{AzureConfig, BridgeConfig, BridgeError, ClassifierConfig, LanguageFilter};
use chat_bridge::{DEFAULT_AZURE_ENDPOINT, DEFAULT_MIN_CONFIDENCE, Result};
use clap::Parser;
use kick_chat::{ResolverConfig, StreamConfig};

#[derive(Parser, Debug)]
#[command(
    name = "kick-translator",
    author,
    version,
    about = "Translate a Kick chatroom live and post the translations back into it",
    long_about = None
)]
pub struct Args {
    /// Channel slug or URL, e.g. `xqc` or `https://kick.com/xqc`
    #[arg(env = "KICK_CHANNEL")]
    pub channel: String,

    /// Bearer token of the account posting translations. Without it nothing is posted.
    #[arg(long, env = "KICK_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,

    /// Chatroom id to use when the channel lookup is blocked
    #[arg(long, env = "KICK_CHATROOM_ID")]
    pub room_id: Option<u64>,

    /// Language translations are produced in (ISO 639-1)
    #[arg(long, env = "TARGET_LANGUAGE", default_value = "en")]
    pub target_language: String,

    /// Messages shorter than this many characters are ignored
    #[arg(long, env = "MIN_MESSAGE_LENGTH", default_value_t = 1)]
    pub min_message_length: usize,

    /// Prefix put in front of every posted translation
    #[arg(long, env = "TRANSLATION_PREFIX", default_value = "🌐 ")]
    pub translation_prefix: String,

    /// Minimum number of seconds between two translations (0 disables)
    #[arg(long, env = "RATE_LIMIT_DELAY", default_value_t = 0.0)]
    pub rate_limit_secs: f64,

    /// Username of the posting account, its own messages are ignored
    #[arg(long, env = "BOT_USERNAME")]
    pub bot_username: Option<String>,

    /// Only translate these languages (comma separated)
    #[arg(
        long,
        env = "ALLOWED_LANGUAGES",
        value_delimiter = ',',
        conflicts_with = "denied_languages"
    )]
    pub allowed_languages: Option<Vec<String>>,

    /// Never translate these languages (comma separated)
    #[arg(long, env = "BLACKLISTED_LANGUAGES", value_delimiter = ',')]
    pub denied_languages: Option<Vec<String>>,

    /// Extra bot usernames whose messages are never translated (comma separated)
    #[arg(long, env = "KNOWN_BOTS", value_delimiter = ',')]
    pub known_bots: Option<Vec<String>>,

    /// Language guesses below this confidence (0 to 1) are discarded
    #[arg(long, env = "MIN_DETECTION_CONFIDENCE", default_value_t = DEFAULT_MIN_CONFIDENCE)]
    pub min_confidence: f64,

    /// Azure Translator subscription key
    #[arg(long, env = "AZURE_TRANSLATOR_KEY", hide_env_values = true)]
    pub translator_key: Option<String>,

    /// Azure Translator endpoint
    #[arg(long, env = "AZURE_TRANSLATOR_ENDPOINT", default_value = DEFAULT_AZURE_ENDPOINT)]
    pub translator_endpoint: String,

    /// Azure resource region, required for regional resources
    #[arg(long, env = "AZURE_TRANSLATOR_REGION")]
    pub translator_region: Option<String>,

    /// Maximum number of translations in flight
    #[arg(long, env = "MAX_IN_FLIGHT", default_value_t = 16)]
    pub max_in_flight: usize,

    /// Seconds to wait before reconnecting to the chat
    #[arg(long, env = "RECONNECT_DELAY", default_value_t = 5)]
    pub reconnect_delay_secs: u64,

    /// Enable debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,
}

/// Validated runtime settings.
#[derive(Debug)]
pub struct Settings {
    pub channel: String,
    pub auth_token: Option<String>,
    pub resolver: ResolverConfig,
    pub stream: StreamConfig,
    pub classifier: ClassifierConfig,
    pub bridge: BridgeConfig,
    pub azure: AzureConfig,
    pub min_confidence: f64,
}

impl Args {
    pub fn into_settings(self) -> Result<Settings> {
        let translator_key = self
            .translator_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| BridgeError::config("AZURE_TRANSLATOR_KEY is not set"))?;

        if !self.rate_limit_secs.is_finite() || self.rate_limit_secs < 0.0 {
            return Err(BridgeError::config(format!(
                "invalid rate limit: {}",
                self.rate_limit_secs
            )));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(BridgeError::config(format!(
                "invalid detection confidence: {}",
                self.min_confidence
            )));
        }
        if self.max_in_flight == 0 {
            return Err(BridgeError::config("max in flight must be at least 1"));
        }

        let language_filter = match (self.allowed_languages, self.denied_languages) {
            (Some(allowed), _) => LanguageFilter::allow(allowed),
            (None, Some(denied)) => LanguageFilter::deny(denied),
            (None, None) => LanguageFilter::Any,
        };

        let rate_limit = Duration::try_from_secs_f64(self.rate_limit_secs).map_err(|_| {
            BridgeError::config(format!("rate limit out of range: {}", self.rate_limit_secs))
        })?;

        let classifier = ClassifierConfig::default()
            .with_target_language(&self.target_language)
            .with_min_message_length(self.min_message_length)
            .with_translation_prefix(self.translation_prefix)
            .with_rate_limit(Some(rate_limit))
            .with_bot_username(self.bot_username)
            .with_known_bots(self.known_bots.unwrap_or_default())
            .with_language_filter(language_filter);
        classifier.validate()?;

        Ok(Settings {
            channel: self.channel,
            auth_token: self.auth_token,
            resolver: ResolverConfig::default().with_manual_room_id(self.room_id),
            stream: StreamConfig {
                reconnect_delay: Duration::from_secs(self.reconnect_delay_secs),
                ..Default::default()
            },
            classifier,
            bridge: BridgeConfig {
                max_in_flight: self.max_in_flight,
                ..Default::default()
            },
            azure: AzureConfig::new(translator_key)
                .with_endpoint(self.translator_endpoint)
                .with_region(self.translator_region),
            min_confidence: self.min_confidence,
        })
    }
}
