//! k-shingle extraction over normalized token streams.

use std::collections::HashSet;

use crate::normalize::tokenize;

/// Extract the set of distinct contiguous `k`-token shingles from raw text.
///
/// Each shingle is the whitespace-joined form of `k` consecutive normalized
/// tokens; duplicates collapse. Texts with fewer than `k` tokens produce the
/// empty set.
pub fn extract(text: &str, k: usize) -> HashSet<String> {
    extract_from_tokens(&tokenize(text), k)
}

/// Shingle a pre-tokenized stream. Callers must provide normalized tokens.
pub fn extract_from_tokens(tokens: &[String], k: usize) -> HashSet<String> {
    if k == 0 || tokens.len() < k {
        return HashSet::new();
    }
    tokens.windows(k).map(|window| window.join(" ")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_every_window_once() {
        let shingles = extract("the quick brown fox jumps", 3);
        let expected: HashSet<String> = [
            "the quick brown",
            "quick brown fox",
            "brown fox jumps",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert_eq!(shingles, expected);
    }

    #[test]
    fn repeated_windows_collapse() {
        let shingles = extract("ha ha ha ha", 2);
        assert_eq!(shingles.len(), 1);
        assert!(shingles.contains("ha ha"));
    }

    #[test]
    fn short_text_yields_empty_set() {
        assert!(extract("too short", 3).is_empty());
        assert!(extract("", 1).is_empty());
    }

    #[test]
    fn normalization_feeds_shingling() {
        let a = extract("The QUICK, brown fox.", 2);
        let b = extract("the quick brown fox", 2);
        assert_eq!(a, b);
    }
}
