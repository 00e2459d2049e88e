//! Language detection.

use isolang::Language;
use tracing::trace;

/// Detects the language of a piece of chat text.
///
/// Implementations return an ISO 639-1 code, or `None` when the text cannot
/// be attributed to a language. They must not panic.
pub trait LanguageDetector: Send + Sync {
    fn detect(&self, text: &str) -> Option<String>;
}

/// Confidence below which a `whatlang` guess is discarded.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.5;

/// Detector backed by `whatlang`.
///
/// Guesses whatlang itself flags as unreliable, or that fall below
/// `min_confidence`, count as undetected.
#[derive(Debug, Clone, Copy)]
pub struct WhatlangDetector {
    min_confidence: f64,
}

impl Default for WhatlangDetector {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

impl WhatlangDetector {
    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }
}

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> Option<String> {
        let info = whatlang::detect(text)?;
        trace!(
            lang = info.lang().code(),
            confidence = info.confidence(),
            reliable = info.is_reliable(),
            "Language guess"
        );
        if !info.is_reliable() || info.confidence() < self.min_confidence {
            return None;
        }
        to_iso_639_1(info.lang().code())
    }
}

/// Map an ISO 639-3 code to its two-letter form.
fn to_iso_639_1(code: &str) -> Option<String> {
    // Mandarin has no 639-1 code of its own
    if code == "cmn" {
        return Some("zh".to_string());
    }
    Language::from_639_3(code)
        .and_then(|lang| lang.to_639_1())
        .map(str::to_string)
}

/// English name of a two-letter language code, falling back to the code itself.
pub fn language_name(code: &str) -> String {
    Language::from_639_1(code)
        .map(|lang| lang.to_name().to_string())
        .unwrap_or_else(|| code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_mapping() {
        assert_eq!(to_iso_639_1("spa").as_deref(), Some("es"));
        assert_eq!(to_iso_639_1("eng").as_deref(), Some("en"));
        assert_eq!(to_iso_639_1("cmn").as_deref(), Some("zh"));
        assert_eq!(to_iso_639_1("zzz"), None);
    }

    #[test]
    fn test_language_name() {
        assert_eq!(language_name("es"), "Spanish");
        assert_eq!(language_name("xx"), "xx");
    }

    #[test]
    fn test_whatlang_detects_long_sentences() {
        let detector = WhatlangDetector::default();
        assert_eq!(
            detector
                .detect("Hola a todos, ¿cómo están hoy? Espero que tengan un buen día")
                .as_deref(),
            Some("es")
        );
        assert_eq!(
            detector
                .detect("Bonjour tout le monde, je suis très content de vous voir ce soir")
                .as_deref(),
            Some("fr")
        );
        assert_eq!(detector.detect("12345 !!! ???"), None);
    }

    #[test]
    fn test_whatlang_discards_unreliable_guesses() {
        let detector = WhatlangDetector::default();
        // Short greetings are where whatlang guesses wildly (tr, eo, ...).
        for (text, expected) in [("Bonjour, ça va?", "fr"), ("Hola amigos", "es")] {
            let detected = detector.detect(text);
            assert!(
                detected.is_none() || detected.as_deref() == Some(expected),
                "{text:?} detected as {detected:?}"
            );
        }

        // Confidence never exceeds 1.0
        let strict = WhatlangDetector::default().with_min_confidence(2.0);
        assert_eq!(
            strict.detect("Hola a todos, ¿cómo están hoy? Espero que tengan un buen día"),
            None
        );
    }
}
