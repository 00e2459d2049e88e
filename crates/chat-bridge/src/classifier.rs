//! Decides which chat messages get translated.
//!
//! Every message runs through a fixed sequence of gates and the first gate
//! that rejects it determines the [`SkipReason`]:
//!
//! 1. own messages
//! 2. minimum length
//! 3. emote and whitespace cleanup, with the minimum length applied again
//! 4. interjections, obvious target-language phrases and `!commands`
//! 5. language detection
//! 6. already in the target language
//! 7. allow/deny language filter
//! 8. translation-prefix and bot loops
//! 9. rate limit

use std::fmt;
use std::sync::Arc;

use kick_chat::InboundMessage;
use tokio::time::Instant;
use tracing::debug;

use crate::cleanup::{clean_text, is_emote_token};
use crate::config::ClassifierConfig;
use crate::detect::LanguageDetector;
use crate::rate::{RateGate, Reservation};

/// Chat interjections and emote names that are never worth translating.
const INTERJECTIONS: &[&str] = &[
    "nice", "good", "bad", "lol", "wow", "yes", "no", "ok", "okay", "hi", "hello", "bye",
    "thanks", "thank", "you", "cool", "great", "awesome", "amazing", "kekw", "poggers", "pog",
    "omegalul", "lul", "ez", "gg", "wp", "nt", "morning", "what", "how", "are", "whats", "up",
    "well", "time", "here", "about", "watch", "happy", "streaming", "breakfast", "sleep",
    "hiiiii",
];

/// English phrases detectors like to misattribute.
const OBVIOUS_ENGLISH_PHRASES: &[&str] = &[
    "good morning",
    "how are you",
    "whats up",
    "hello",
    "hi there",
    "morning",
    "how was your sleep",
    "did you sleep well",
    "happy streaming",
];

/// Texts shorter than this may be overridden to English when made of interjections.
const SHORT_TEXT_CHARS: usize = 15;

/// Why a message was not translated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    OwnMessage,
    TooShort,
    Empty,
    CommonPhrase,
    CommandPrefix,
    NotAlpha,
    Undetected,
    AlreadyTarget,
    Denylisted,
    PrefixLoop,
    BotLoop,
    RateLimited,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OwnMessage => "own-message",
            Self::TooShort => "too-short",
            Self::Empty => "empty",
            Self::CommonPhrase => "common-phrase",
            Self::CommandPrefix => "command-prefix",
            Self::NotAlpha => "not-alpha",
            Self::Undetected => "undetected",
            Self::AlreadyTarget => "already-target",
            Self::Denylisted => "denylisted",
            Self::PrefixLoop => "prefix-loop",
            Self::BotLoop => "bot-loop",
            Self::RateLimited => "rate-limited",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Translate,
    Skip(SkipReason),
}

/// Outcome of classifying one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub cleaned_text: String,
    pub detected_language: Option<String>,
    pub decision: Decision,
    /// Rate-gate slot taken for this message, present only for `Translate`
    pub reservation: Option<Reservation>,
}

impl Classification {
    fn skip(cleaned_text: String, detected_language: Option<String>, reason: SkipReason) -> Self {
        Self {
            cleaned_text,
            detected_language,
            decision: Decision::Skip(reason),
            reservation: None,
        }
    }

    pub fn should_translate(&self) -> bool {
        self.decision == Decision::Translate
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self.decision {
            Decision::Skip(reason) => Some(reason),
            Decision::Translate => None,
        }
    }
}

pub struct MessageClassifier {
    config: ClassifierConfig,
    detector: Arc<dyn LanguageDetector>,
    rate_gate: Arc<RateGate>,
}

impl MessageClassifier {
    pub fn new(config: ClassifierConfig, detector: Arc<dyn LanguageDetector>) -> Self {
        let rate_gate = Arc::new(RateGate::new(config.rate_limit));
        Self {
            config,
            detector,
            rate_gate,
        }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// The gate shared with dispatched tasks so failed sends can roll back.
    pub fn rate_gate(&self) -> Arc<RateGate> {
        Arc::clone(&self.rate_gate)
    }

    /// Run `message` through every gate.
    ///
    /// A `Translate` decision has already reserved the rate-gate slot at `now`.
    pub fn classify(&self, message: &InboundMessage, now: Instant) -> Classification {
        let sender = message.username.to_lowercase();

        if self.config.bot_username.as_deref() == Some(sender.as_str()) {
            return Classification::skip(String::new(), None, SkipReason::OwnMessage);
        }

        let length = message.raw_text.trim().chars().count();
        if length < self.config.min_message_length {
            return self.skipped(message, String::new(), None, SkipReason::TooShort);
        }

        let cleaned = clean_text(&message.raw_text);
        if cleaned.is_empty() {
            return self.skipped(message, cleaned, None, SkipReason::Empty);
        }
        // Emotes do not count towards the minimum length
        if cleaned.chars().count() < self.config.min_message_length {
            return self.skipped(message, cleaned, None, SkipReason::TooShort);
        }

        if let Some(reason) = self.phrase_gate(&cleaned) {
            return self.skipped(message, cleaned, None, reason);
        }

        let language = match self.detect_language(&message.raw_text, &cleaned) {
            Ok(language) => language,
            Err(reason) => return self.skipped(message, cleaned, None, reason),
        };

        if language == self.config.target_language {
            return self.skipped(message, cleaned, Some(language), SkipReason::AlreadyTarget);
        }

        if !self.config.language_filter.permits(&language) {
            return self.skipped(message, cleaned, Some(language), SkipReason::Denylisted);
        }

        let prefix = self.config.translation_prefix.trim();
        if !prefix.is_empty() && cleaned.starts_with(prefix) {
            return self.skipped(message, cleaned, Some(language), SkipReason::PrefixLoop);
        }

        if self.config.known_bots.contains(&sender) {
            return self.skipped(message, cleaned, Some(language), SkipReason::BotLoop);
        }

        match self.rate_gate.try_reserve(now) {
            Ok(reservation) => Classification {
                cleaned_text: cleaned,
                detected_language: Some(language),
                decision: Decision::Translate,
                reservation,
            },
            Err(remaining) => {
                debug!(
                    user = %message.username,
                    remaining_ms = remaining.as_millis() as u64,
                    "Rate limited"
                );
                Classification::skip(cleaned, Some(language), SkipReason::RateLimited)
            }
        }
    }

    fn skipped(
        &self,
        message: &InboundMessage,
        cleaned: String,
        language: Option<String>,
        reason: SkipReason,
    ) -> Classification {
        debug!(
            user = %message.username,
            lang = language.as_deref().unwrap_or("-"),
            "Skipped ({}): {}",
            reason,
            message.raw_text
        );
        Classification::skip(cleaned, language, reason)
    }

    fn phrase_gate(&self, cleaned: &str) -> Option<SkipReason> {
        let lower = cleaned.to_lowercase();
        if INTERJECTIONS.contains(&lower.as_str()) {
            return Some(SkipReason::CommonPhrase);
        }
        if self.targets_english()
            && OBVIOUS_ENGLISH_PHRASES
                .iter()
                .any(|phrase| lower.contains(phrase))
        {
            return Some(SkipReason::CommonPhrase);
        }
        if cleaned.starts_with('!') {
            return Some(SkipReason::CommandPrefix);
        }
        None
    }

    fn targets_english(&self) -> bool {
        self.config.target_language == "en"
    }

    /// Detected ISO 639-1 code of `cleaned`, or the reason detection gave up.
    fn detect_language(&self, raw: &str, cleaned: &str) -> Result<String, SkipReason> {
        if !cleaned.chars().any(char::is_alphabetic) {
            return Err(SkipReason::NotAlpha);
        }

        let target = &self.config.target_language;
        if is_emote_token(raw) || is_letter_run(cleaned) {
            return Ok(target.clone());
        }

        let is_all_caps = cleaned.chars().any(char::is_uppercase)
            && !cleaned.chars().any(char::is_lowercase);
        let detected = if is_all_caps {
            self.detector.detect(&cleaned.to_lowercase())
        } else {
            self.detector.detect(cleaned)
        };
        let Some(language) = detected else {
            return Err(SkipReason::Undetected);
        };

        if language != *target
            && self.targets_english()
            && cleaned.chars().count() < SHORT_TEXT_CHARS
            && mostly_interjections(cleaned)
        {
            return Ok(target.clone());
        }

        Ok(language)
    }
}

/// A single word made of one repeated letter, e.g. `a` or `kkkkk`.
fn is_letter_run(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() => {
            let first = first.to_lowercase().to_string();
            chars.all(|c| c.to_lowercase().to_string() == first)
        }
        _ => false,
    }
}

/// At least 80% of the words are known interjections.
fn mostly_interjections(text: &str) -> bool {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();
    if words.is_empty() {
        return false;
    }
    let known = words
        .iter()
        .filter(|word| INTERJECTIONS.contains(word))
        .count();
    known * 5 >= words.len() * 4
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LanguageFilter;
    use std::time::Duration;

    /// Detector answering with a fixed code.
    struct FixedDetector(Option<&'static str>);

    impl LanguageDetector for FixedDetector {
        fn detect(&self, _text: &str) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    fn build(config: ClassifierConfig, detected: Option<&'static str>) -> MessageClassifier {
        MessageClassifier::new(config, Arc::new(FixedDetector(detected)))
    }

    fn reason(classifier: &MessageClassifier, user: &str, text: &str) -> Option<SkipReason> {
        classifier
            .classify(&InboundMessage::new(user, text), Instant::now())
            .skip_reason()
    }

    #[test]
    fn test_skip_reason_names() {
        assert_eq!(SkipReason::TooShort.to_string(), "too-short");
        assert_eq!(SkipReason::PrefixLoop.as_str(), "prefix-loop");
        assert_eq!(SkipReason::RateLimited.as_str(), "rate-limited");
    }

    #[test]
    fn test_spanish_message_is_translated() {
        let classifier = build(ClassifierConfig::default(), Some("es"));
        let result = classifier.classify(
            &InboundMessage::new("pepe", "Hola, ¿cómo estás? [emote:1:wave]"),
            Instant::now(),
        );
        assert!(result.should_translate());
        assert_eq!(result.cleaned_text, "Hola, ¿cómo estás?");
        assert_eq!(result.detected_language.as_deref(), Some("es"));
        // No rate limit configured, nothing reserved.
        assert_eq!(result.reservation, None);
    }

    #[test]
    fn test_own_messages_are_never_translated() {
        let config = ClassifierConfig::default().with_bot_username(Some("TransBot"));
        let classifier = build(config, Some("es"));
        assert_eq!(
            reason(&classifier, "transbot", "Hola amigos, ¿qué tal?"),
            Some(SkipReason::OwnMessage)
        );
        assert_eq!(
            reason(&classifier, "TRANSBOT", "Hola amigos, ¿qué tal?"),
            Some(SkipReason::OwnMessage)
        );
    }

    #[test]
    fn test_too_short() {
        let config = ClassifierConfig::default().with_min_message_length(5);
        let classifier = build(config, Some("es"));
        assert_eq!(reason(&classifier, "pepe", "  hol  "), Some(SkipReason::TooShort));
        assert_eq!(reason(&classifier, "pepe", "holas amigos"), None);
    }

    #[test]
    fn test_too_short_after_emote_cleanup() {
        let config = ClassifierConfig::default().with_min_message_length(10);
        let classifier = build(config, Some("es"));
        assert_eq!(
            reason(&classifier, "pepe", "[emote:37226:KEKW] hola"),
            Some(SkipReason::TooShort)
        );
        // An emote-only message is still empty, not too short.
        assert_eq!(
            reason(&classifier, "pepe", "[emote:37226:KEKW] [emote:1:wave]"),
            Some(SkipReason::Empty)
        );
        assert_eq!(reason(&classifier, "pepe", "hola amigos [emote:1:wave]"), None);
    }

    #[test]
    fn test_cleanup_and_phrase_gates() {
        let classifier = build(ClassifierConfig::default(), Some("es"));
        assert_eq!(
            reason(&classifier, "pepe", "[emote:1:a]  [emote:2:b]"),
            Some(SkipReason::Empty)
        );
        assert_eq!(reason(&classifier, "pepe", "KEKW"), Some(SkipReason::CommonPhrase));
        assert_eq!(
            reason(&classifier, "pepe", "good morning chat"),
            Some(SkipReason::CommonPhrase)
        );
        assert_eq!(
            reason(&classifier, "pepe", "!discord"),
            Some(SkipReason::CommandPrefix)
        );
    }

    #[test]
    fn test_obvious_phrases_only_apply_to_english_target() {
        let config = ClassifierConfig::default().with_target_language("de");
        let classifier = build(config, Some("es"));
        assert_eq!(reason(&classifier, "pepe", "good morning chat"), None);
    }

    #[test]
    fn test_detection_gates() {
        let classifier = build(ClassifierConfig::default(), Some("es"));
        assert_eq!(reason(&classifier, "pepe", "1234 ?!"), Some(SkipReason::NotAlpha));
        assert_eq!(reason(&classifier, "pepe", "kkkkkk"), Some(SkipReason::AlreadyTarget));

        let undetected = build(ClassifierConfig::default(), None);
        assert_eq!(
            reason(&undetected, "pepe", "zxqv wpfk"),
            Some(SkipReason::Undetected)
        );

        let english = build(ClassifierConfig::default(), Some("en"));
        assert_eq!(
            reason(&english, "pepe", "see you tomorrow"),
            Some(SkipReason::AlreadyTarget)
        );
    }

    #[test]
    fn test_short_interjection_text_is_forced_to_target() {
        let classifier = build(ClassifierConfig::default(), Some("nl"));
        assert_eq!(reason(&classifier, "pepe", "gg wp ez"), Some(SkipReason::AlreadyTarget));
    }

    #[test]
    fn test_all_caps_text_is_lowercased_for_detection() {
        struct LowercaseOnly;
        impl LanguageDetector for LowercaseOnly {
            fn detect(&self, text: &str) -> Option<String> {
                (text == text.to_lowercase()).then(|| "es".to_string())
            }
        }
        let classifier =
            MessageClassifier::new(ClassifierConfig::default(), Arc::new(LowercaseOnly));
        assert_eq!(reason(&classifier, "pepe", "QUE BUENO ESTA"), None);
    }

    #[test]
    fn test_language_filter() {
        let allow = ClassifierConfig::default().with_language_filter(LanguageFilter::allow(["pt"]));
        assert_eq!(
            reason(&build(allow, Some("es")), "pepe", "hola amigos de kick"),
            Some(SkipReason::Denylisted)
        );

        let deny = ClassifierConfig::default().with_language_filter(LanguageFilter::deny(["es"]));
        assert_eq!(
            reason(&build(deny, Some("es")), "pepe", "hola amigos de kick"),
            Some(SkipReason::Denylisted)
        );
    }

    #[test]
    fn test_loop_prevention() {
        let classifier = build(ClassifierConfig::default(), Some("es"));
        assert_eq!(
            reason(&classifier, "pepe", "🌐 [by juan] hola amigos (es > en)"),
            Some(SkipReason::PrefixLoop)
        );
        assert_eq!(
            reason(&classifier, "KickBot", "hola amigos de kick"),
            Some(SkipReason::BotLoop)
        );
    }

    #[test]
    fn test_rate_limit_reserves_slot() {
        let config = ClassifierConfig::default().with_rate_limit(Some(Duration::from_secs(2)));
        let classifier = build(config, Some("es"));
        let start = Instant::now();

        let first = classifier.classify(&InboundMessage::new("a", "hola amigos"), start);
        assert!(first.should_translate());
        assert!(first.reservation.is_some());

        let second = classifier.classify(
            &InboundMessage::new("b", "buenas noches"),
            start + Duration::from_millis(500),
        );
        assert_eq!(second.skip_reason(), Some(SkipReason::RateLimited));

        // Rolling back the first slot frees the gate again.
        classifier.rate_gate().release(first.reservation.unwrap());
        let third = classifier.classify(
            &InboundMessage::new("b", "buenas noches"),
            start + Duration::from_millis(600),
        );
        assert!(third.should_translate());
    }

    #[test]
    fn test_mostly_interjections() {
        assert!(mostly_interjections("gg wp"));
        assert!(!mostly_interjections("gg amigos"));
        assert!(!mostly_interjections(""));
    }
}
