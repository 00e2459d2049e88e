//! Machine translation of classified messages.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{BridgeError, Result};

pub const DEFAULT_AZURE_ENDPOINT: &str = "https://api.cognitive.microsofttranslator.com";
const AZURE_API_VERSION: &str = "3.0";
const TRANSLATE_TIMEOUT: Duration = Duration::from_secs(10);

/// A finished translation, ready to be posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationResult {
    pub source_lang: String,
    pub target_lang: String,
    pub translated_text: String,
}

impl TranslationResult {
    /// Chat line attributing the translation to `sender`.
    ///
    /// `{prefix}[by {sender}] {text} ({src} > {tgt})`
    pub fn format(&self, prefix: &str, sender: &str) -> String {
        format!(
            "{}[by {}] {} ({} > {})",
            prefix, sender, self.translated_text, self.source_lang, self.target_lang
        )
    }
}

/// A machine translation backend.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Translate `text` from `from` to `to`.
    ///
    /// `Ok(None)` means the provider answered without a translation.
    async fn translate(&self, text: &str, from: &str, to: &str) -> Result<Option<String>>;
}

#[derive(Debug, Clone)]
pub struct AzureConfig {
    pub endpoint: String,
    pub key: String,
    pub region: Option<String>,
    pub timeout: Duration,
}

impl AzureConfig {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_AZURE_ENDPOINT.to_string(),
            key: key.into(),
            region: None,
            timeout: TRANSLATE_TIMEOUT,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_region(mut self, region: Option<String>) -> Self {
        self.region = region.filter(|r| !r.trim().is_empty());
        self
    }
}

#[derive(Serialize)]
struct AzureRequestItem<'a> {
    #[serde(rename = "Text")]
    text: &'a str,
}

#[derive(Deserialize)]
struct AzureResponseItem {
    #[serde(default)]
    translations: Vec<AzureTranslation>,
}

#[derive(Deserialize)]
struct AzureTranslation {
    text: String,
}

/// Azure AI Translator (Text Translation v3).
pub struct AzureTranslator {
    client: Client,
    config: AzureConfig,
}

impl AzureTranslator {
    pub fn new(client: Client, config: AzureConfig) -> Result<Self> {
        if config.key.trim().is_empty() {
            return Err(BridgeError::config("translator key is empty"));
        }
        Ok(Self { client, config })
    }
}

#[async_trait]
impl TranslationProvider for AzureTranslator {
    fn name(&self) -> &str {
        "azure"
    }

    async fn translate(&self, text: &str, from: &str, to: &str) -> Result<Option<String>> {
        let url = format!("{}/translate", self.config.endpoint.trim_end_matches('/'));

        let mut request = self
            .client
            .post(&url)
            .query(&[("api-version", AZURE_API_VERSION), ("from", from), ("to", to)])
            .header("Ocp-Apim-Subscription-Key", &self.config.key)
            .header("X-ClientTraceId", Uuid::new_v4().to_string())
            .json(&[AzureRequestItem { text }])
            .timeout(self.config.timeout);
        if let Some(region) = &self.config.region {
            request = request.header("Ocp-Apim-Subscription-Region", region);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::provider(format!("status {status}: {body}")));
        }

        let items: Vec<AzureResponseItem> = response.json().await?;
        Ok(items
            .into_iter()
            .next()
            .and_then(|item| item.translations.into_iter().next())
            .map(|translation| translation.text))
    }
}

/// Decode HTML entities such as `&#39;`, `&amp;` or `&eacute;`.
///
/// Unknown or unterminated entities are left as they are.
pub fn decode_entities(text: &str) -> Cow<'_, str> {
    html_escape::decode_html_entities(text)
}

/// Wraps the configured provider and normalizes its output.
#[derive(Clone)]
pub struct Translator {
    provider: Option<Arc<dyn TranslationProvider>>,
    target_language: String,
}

impl Translator {
    pub fn new(
        provider: Option<Arc<dyn TranslationProvider>>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            target_language: target_language.into(),
        }
    }

    /// Translate already cleaned text. Every failure degrades to `None`.
    pub async fn translate(&self, text: &str, source_lang: &str) -> Option<TranslationResult> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let Some(provider) = &self.provider else {
            warn!("No translation provider configured, cannot translate");
            return None;
        };

        let translated = match provider
            .translate(text, source_lang, &self.target_language)
            .await
        {
            Ok(Some(translated)) => translated,
            Ok(None) => {
                warn!("Empty translation response from {}", provider.name());
                return None;
            }
            Err(e) => {
                warn!("Translation error from {}: {}", provider.name(), e);
                return None;
            }
        };

        let translated = decode_entities(&translated).trim().to_string();
        if translated.is_empty() {
            debug!("Translation of {:?} came back empty", text);
            return None;
        }

        Some(TranslationResult {
            source_lang: source_lang.to_string(),
            target_lang: self.target_language.clone(),
            translated_text: translated,
        })
    }
}
