//! Utility functions and helpers.

pub mod debounce;
pub mod http;

use std::borrow::Cow;

use unicode_segmentation::UnicodeSegmentation;

/// Shorten `text` to `max_chars` graphemes, appending `...` when cut.
pub fn truncate_text(text: &str, max_chars: usize) -> Cow<'_, str> {
    match text.grapheme_indices(true).nth(max_chars) {
        Some((byte_idx, _)) => Cow::Owned(format!("{}...", &text[..byte_idx])),
        None => Cow::Borrowed(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_text_untouched() {
        assert_eq!(truncate_text("Nile", 10), "Nile");
        assert!(matches!(truncate_text("Nile", 4), Cow::Borrowed(_)));
    }

    #[test]
    fn test_truncate_long_text() {
        assert_eq!(truncate_text("Hieroglyphics", 5), "Hiero...");
    }

    #[test]
    fn test_truncate_respects_graphemes() {
        let text = "Ra\u{0301}messes";
        assert_eq!(truncate_text(text, 3), "Ra\u{0301}m...");
    }
}
