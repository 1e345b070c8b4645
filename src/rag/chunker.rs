//! Word-bounded text chunking.

use crate::core::config::defaults::DEFAULT_CHUNK_WORDS;

/// Splits `text` into chunks of at most `max_words` whitespace-delimited words.
///
/// Chunks are in original order, do not overlap, and together contain every
/// word exactly once, re-joined with single spaces. Empty or whitespace-only
/// input yields no chunks. A `max_words` of zero is treated as one.
pub fn chunk_text(text: &str, max_words: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    words
        .chunks(max_words.max(1))
        .map(|group| group.join(" "))
        .collect()
}

/// [`chunk_text`] with the default bound of 500 words.
pub fn chunk_text_default(text: &str) -> Vec<String> {
    chunk_text(text, DEFAULT_CHUNK_WORDS)
}
