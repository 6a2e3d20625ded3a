//! Text normalization and tokenization for shingling.
//!
//! Transforms raw article text into a deterministic token stream: Unicode
//! NFKC normalization, lowercasing, punctuation stripping, and whitespace
//! tokenization. The same input always produces the same token stream.

use unicode_categories::UnicodeCategories;
use unicode_normalization::UnicodeNormalization;

/// Tokenize raw text into normalized words.
///
/// Punctuation and whitespace both act as delimiters; lowercasing can expand
/// a single character into multiple (e.g. German `ß` -> `ss`).
pub fn tokenize(text: &str) -> Vec<String> {
    let mut cleaned = String::with_capacity(text.len());
    for ch in text.nfkc() {
        if ch.is_whitespace() || ch.is_punctuation() {
            cleaned.push(' ');
        } else {
            for lower in ch.to_lowercase() {
                cleaned.push(lower);
            }
        }
    }
    cleaned
        .split_whitespace()
        .map(|word| word.to_string())
        .collect()
}
