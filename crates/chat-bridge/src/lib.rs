//! Chat translation pipeline.
//!
//! ## Core Types
//!
//! - [`MessageClassifier`] - Decide whether a chat message should be translated
//! - [`Translator`] - Call a [`TranslationProvider`] and normalize its output
//! - [`Bridge`] - Wire a message stream through classification, translation and publishing

pub mod bridge;
pub mod classifier;
pub mod cleanup;
pub mod config;
pub mod detect;
pub mod error;
pub mod rate;
pub mod translator;

pub use bridge::{Bridge, MessageSink};
pub use classifier::{Classification, Decision, MessageClassifier, SkipReason};
pub use cleanup::clean_text;
pub use config::{BridgeConfig, ClassifierConfig, DEFAULT_BOT_NAMES, LanguageFilter};
pub use detect::{DEFAULT_MIN_CONFIDENCE, LanguageDetector, WhatlangDetector, language_name};
pub use error::{BridgeError, Result};
pub use rate::{RateGate, Reservation};
pub use translator::{
    AzureConfig, AzureTranslator, DEFAULT_AZURE_ENDPOINT, TranslationProvider, TranslationResult,
    Translator, decode_entities,
};
