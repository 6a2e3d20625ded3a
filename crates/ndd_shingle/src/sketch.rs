//! Min-hash sketch generation.
//!
//! A sketch is one minimum fingerprint per configured permutation key.
//! Permutations are applied as `fingerprint ^ key`: XOR is an involution,
//! not a uniform permutation over the fingerprint domain, so the collision
//! probability of two sketches only approximates the true Jaccard similarity
//! of the underlying shingle sets. The exact comparator corrects for this
//! during verification, and downstream thresholds are tuned against this
//! exact behavior.

use std::collections::HashSet;

use rayon::prelude::*;

use crate::config::{SketchConfig, SourceKeyConfig};
use crate::fingerprint::fingerprint;
use crate::shingles;

/// Compute a document's min-hash sketch from raw text.
///
/// Returns the empty sketch when the text has fewer tokens than
/// `shingle_length`; such documents carry no signature and cannot be
/// deduplicated. `max_shingles` is carried in the config but no
/// truncation is applied before sketching.
pub fn generate(text: &str, cfg: &SketchConfig) -> Vec<u64> {
    let shingle_set = shingles::extract(text, cfg.shingle_length);
    sketch_of_shingles(&shingle_set, cfg)
}

/// Sketch a pre-extracted shingle set (parallel if `cfg.use_parallel`).
pub fn sketch_of_shingles(shingle_set: &HashSet<String>, cfg: &SketchConfig) -> Vec<u64> {
    if shingle_set.is_empty() {
        return Vec::new();
    }
    let modulus = cfg.modulus();
    let prints: Vec<u64> = shingle_set
        .iter()
        .map(|shingle| fingerprint(shingle, cfg.base, modulus))
        .collect();

    if cfg.use_parallel {
        cfg.permutations
            .par_iter()
            .map(|&key| min_slot(&prints, key))
            .collect()
    } else {
        cfg.permutations
            .iter()
            .map(|&key| min_slot(&prints, key))
            .collect()
    }
}

/// Minimum of `f ^ key` over all fingerprints. `prints` is never empty here.
#[inline]
fn min_slot(prints: &[u64], key: u64) -> u64 {
    prints.iter().map(|&f| f ^ key).min().unwrap_or(u64::MAX)
}

/// Fingerprint a source identifier for index partitioning.
///
/// Pure fingerprinting mode: no shingling and no permutation keys. The raw
/// fingerprint is offset into the signed range by `2^(bits-1)` for compact
/// storage.
pub fn source_fingerprint(source_id: &str, cfg: &SourceKeyConfig) -> i64 {
    let raw = fingerprint(source_id, cfg.base, cfg.modulus());
    raw as i64 - (1i64 << (cfg.modulus_bits - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> SketchConfig {
        SketchConfig {
            shingle_length: 3,
            ..Default::default()
        }
    }

    const TEXT: &str = "the quick brown fox jumps over the lazy dog";

    #[test]
    fn sketch_is_deterministic() {
        let cfg = test_config();
        assert_eq!(generate(TEXT, &cfg), generate(TEXT, &cfg));
    }

    #[test]
    fn parallel_and_serial_sketches_agree() {
        let serial = test_config();
        let parallel = SketchConfig {
            use_parallel: true,
            ..test_config()
        };
        assert_eq!(generate(TEXT, &serial), generate(TEXT, &parallel));
    }

    #[test]
    fn one_slot_per_permutation_key() {
        let cfg = test_config();
        assert_eq!(generate(TEXT, &cfg).len(), cfg.permutations.len());
    }

    #[test]
    fn short_text_yields_empty_sketch() {
        let cfg = test_config();
        assert!(generate("too short", &cfg).is_empty());
        assert!(generate("", &cfg).is_empty());
    }

    #[test]
    fn no_permutations_yields_empty_sketch() {
        let cfg = SketchConfig {
            permutations: Vec::new(),
            ..test_config()
        };
        assert!(generate(TEXT, &cfg).is_empty());
    }

    #[test]
    fn sketch_values_stay_inside_modulus() {
        let cfg = test_config();
        let modulus = cfg.modulus();
        assert!(generate(TEXT, &cfg).iter().all(|&v| v < modulus));
    }

    #[test]
    fn identical_texts_share_sketches_across_sources() {
        let cfg = test_config();
        let a = generate(TEXT, &cfg);
        let b = generate(TEXT, &cfg);
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn source_fingerprint_is_offset_into_signed_range() {
        let cfg = SourceKeyConfig::default();
        let fp = source_fingerprint("example.com", &cfg);
        let half = 1i64 << (cfg.modulus_bits - 1);
        assert!(fp >= -half && fp < half);
        assert_eq!(fp, source_fingerprint("example.com", &cfg));
    }

    #[test]
    fn distinct_sources_usually_partition_apart() {
        let cfg = SourceKeyConfig::default();
        assert_ne!(
            source_fingerprint("example.com", &cfg),
            source_fingerprint("other.net", &cfg)
        );
    }
}
