use serde::Serialize;

use crate::html;

const WORDS_PER_PAGE: usize = 250;
const WORDS_PER_MINUTE: usize = 200;

/// Rough size figures for a styled document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DocumentStats {
    pub word_count: usize,
    pub page_count: usize,
    pub reading_minutes: usize,
}

impl DocumentStats {
    pub fn from_html(html: &str) -> Self {
        let (prose, _css) = html::take_style_blocks(html);
        // Adjacent elements (`</h1><p>`) still separate words.
        let spaced = prose.replace('<', " <");
        let text = html::strip_tags(&spaced);
        // Punctuation split off by a closing inline tag is not a word.
        let words = text
            .split_whitespace()
            .filter(|token| token.chars().any(char::is_alphanumeric))
            .count();
        Self::from_words(words)
    }

    pub fn from_words(word_count: usize) -> Self {
        Self {
            word_count,
            page_count: word_count.div_ceil(WORDS_PER_PAGE),
            reading_minutes: word_count.div_ceil(WORDS_PER_MINUTE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratios() {
        assert_eq!(
            DocumentStats::from_words(0),
            DocumentStats {
                word_count: 0,
                page_count: 0,
                reading_minutes: 0
            }
        );
        let stats = DocumentStats::from_words(251);
        assert_eq!(stats.page_count, 2);
        assert_eq!(stats.reading_minutes, 2);
        let stats = DocumentStats::from_words(200);
        assert_eq!(stats.page_count, 1);
        assert_eq!(stats.reading_minutes, 1);
    }

    #[test]
    fn counts_text_outside_tags_and_styles() {
        let html = "<html><head><style>body { margin: 0 }</style></head><body><h1>Two words</h1><p>and three more</p></body></html>";
        assert_eq!(DocumentStats::from_html(html).word_count, 5);
    }

    #[test]
    fn punctuation_after_inline_tags_is_not_counted() {
        let html = "<p>Hello <em>world</em>. It is <strong>late</strong>, so - 2 am.</p>";
        assert_eq!(DocumentStats::from_html(html).word_count, 8);
    }
}
