//! Chat text normalization.

use std::sync::LazyLock;

use regex::Regex;

/// Kick emote markup, e.g. `[emote:37226:KEKW]`
static EMOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[emote:\d+:[^\]]+\]").unwrap());

static SINGLE_EMOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[emote:\d+:[^\]]+\]$").unwrap());

/// Strip emote tokens and collapse runs of whitespace into single spaces.
///
/// The result is trimmed and applying it twice yields the same string.
pub fn clean_text(text: &str) -> String {
    let stripped = EMOTE_RE.replace_all(text, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether `text` is nothing but a single emote token.
pub fn is_emote_token(text: &str) -> bool {
    SINGLE_EMOTE_RE.is_match(text.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_strips_emotes_and_whitespace() {
        assert_eq!(
            clean_text("hola [emote:37226:KEKW]   amigos [emote:1:x]"),
            "hola amigos"
        );
        assert_eq!(clean_text("a[emote:5:pog]b"), "a b");
        assert_eq!(clean_text("  \t\n "), "");
        assert_eq!(clean_text("[emote:1:a][emote:2:b]"), "");
    }

    #[test]
    fn test_keeps_non_emote_brackets() {
        assert_eq!(clean_text("[emote:abc:x] hi"), "[emote:abc:x] hi");
        assert_eq!(clean_text("[by pepe] hi"), "[by pepe] hi");
    }

    #[test]
    fn test_emote_token() {
        assert!(is_emote_token("[emote:37226:KEKW]"));
        assert!(is_emote_token(" [emote:1:a] "));
        assert!(!is_emote_token("[emote:1:a] hola"));
        assert!(!is_emote_token("hola"));
    }

    proptest! {
        #[test]
        fn test_clean_is_idempotent(text in ".{0,64}") {
            let once = clean_text(&text);
            prop_assert_eq!(clean_text(&once), once);
        }

        #[test]
        fn test_clean_is_idempotent_with_emotes(
            words in prop::collection::vec("[a-zA-Z ]{0,8}|\\[emote:[0-9]{1,5}:[a-zA-Z]{1,6}\\]", 0..8)
        ) {
            let text = words.concat();
            let once = clean_text(&text);
            prop_assert!(!EMOTE_RE.is_match(&once));
            prop_assert_eq!(clean_text(&once), once);
        }
    }
}
