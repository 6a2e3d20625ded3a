//! Exact shingle-set comparison.
//!
//! This is the verification oracle behind the approximate min-hash filter:
//! cheap enough to run against the small candidate set that survives
//! collision counting, never against the whole corpus.

use std::collections::HashSet;

use crate::shingles;

/// Exact Jaccard similarity of two shingle sets.
///
/// Two empty sets compare as `0.0` by convention, never as duplicates.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

/// Whether two texts overlap strictly more than `overlap_threshold`.
///
/// Symmetric in its two text arguments.
pub fn similar(a_text: &str, b_text: &str, shingle_length: usize, overlap_threshold: f64) -> bool {
    let a = shingles::extract(a_text, shingle_length);
    let b = shingles::extract(b_text, shingle_length);
    jaccard(&a, &b) > overlap_threshold
}
