//! Immutable settings for the classifier and the bridge.

use std::collections::HashSet;
use std::time::Duration;

use crate::error::{BridgeError, Result};

/// Translation bots whose output must never be translated again.
pub const DEFAULT_BOT_NAMES: &[&str] = &[
    "chattranslator",
    "aitranslatorbot",
    "translator",
    "translate_bot",
    "kickbot",
];

pub const DEFAULT_TARGET_LANGUAGE: &str = "en";
pub const DEFAULT_TRANSLATION_PREFIX: &str = "🌐 ";

/// Which detected source languages may be translated.
///
/// Allow and deny lists are separate modes; exactly one applies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LanguageFilter {
    #[default]
    Any,
    /// Only these languages are translated.
    Allow(HashSet<String>),
    /// These languages are never translated.
    Deny(HashSet<String>),
}

fn normalize_codes<I, S>(codes: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    codes
        .into_iter()
        .map(|code| code.as_ref().trim().to_lowercase())
        .filter(|code| !code.is_empty())
        .collect()
}

impl LanguageFilter {
    pub fn allow<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::Allow(normalize_codes(codes))
    }

    pub fn deny<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::Deny(normalize_codes(codes))
    }

    pub fn permits(&self, language: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Allow(codes) => codes.contains(language),
            Self::Deny(codes) => !codes.contains(language),
        }
    }
}

/// Settings for [`crate::MessageClassifier`].
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// ISO 639-1 code translations are produced in
    pub target_language: String,
    /// Messages shorter than this (in characters, after trimming) are skipped
    pub min_message_length: usize,
    /// Prefix put in front of every posted translation
    pub translation_prefix: String,
    /// Minimum interval between two translations, `None` disables the gate
    pub rate_limit: Option<Duration>,
    /// The bot's own account, lower-cased
    pub bot_username: Option<String>,
    /// Other translation bots, lower-cased
    pub known_bots: HashSet<String>,
    pub language_filter: LanguageFilter,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            target_language: DEFAULT_TARGET_LANGUAGE.to_string(),
            min_message_length: 1,
            translation_prefix: DEFAULT_TRANSLATION_PREFIX.to_string(),
            rate_limit: None,
            bot_username: None,
            known_bots: DEFAULT_BOT_NAMES.iter().map(|s| s.to_string()).collect(),
            language_filter: LanguageFilter::Any,
        }
    }
}

impl ClassifierConfig {
    pub fn with_target_language(mut self, language: impl AsRef<str>) -> Self {
        self.target_language = language.as_ref().trim().to_lowercase();
        self
    }

    pub fn with_min_message_length(mut self, length: usize) -> Self {
        self.min_message_length = length;
        self
    }

    pub fn with_translation_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.translation_prefix = prefix.into();
        self
    }

    pub fn with_rate_limit(mut self, interval: Option<Duration>) -> Self {
        self.rate_limit = interval.filter(|d| !d.is_zero());
        self
    }

    pub fn with_bot_username(mut self, username: Option<impl AsRef<str>>) -> Self {
        self.bot_username = username
            .map(|name| name.as_ref().trim().to_lowercase())
            .filter(|name| !name.is_empty());
        self
    }

    pub fn with_known_bots<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.known_bots.extend(normalize_codes(names));
        self
    }

    pub fn with_language_filter(mut self, filter: LanguageFilter) -> Self {
        self.language_filter = filter;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_language.is_empty() {
            return Err(BridgeError::config("target language must not be empty"));
        }
        if let LanguageFilter::Allow(codes) = &self.language_filter
            && codes.is_empty()
        {
            return Err(BridgeError::config(
                "allowed language list is empty, nothing would be translated",
            ));
        }
        Ok(())
    }
}

/// Settings for the dispatching side of [`crate::Bridge`].
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Maximum number of translate+publish tasks in flight
    pub max_in_flight: usize,
    /// How long shutdown waits for in-flight tasks
    pub shutdown_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 16,
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}
