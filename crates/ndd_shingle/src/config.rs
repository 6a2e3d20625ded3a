//! Configuration and error types for sketch generation.
//!
//! This module defines the public configuration surface for the shingling and
//! sketching layer. It is intentionally free of any I/O or
//! environment-dependent behavior so that sketch generation is a pure function
//! of `(text, config)`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Semantic configuration for min-hash sketch generation.
///
/// Two configs with equal fields always produce bit-identical sketches for
/// equal input text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SketchConfig {
    /// Number of tokens per shingle (k-shingling).
    ///
    /// Larger values are more robust to incidental word overlap but less
    /// tolerant to small edits.
    pub shingle_length: usize,
    /// Upper bound on the shingle set size carried in the public contract.
    ///
    /// No truncation is currently applied; large documents keep their full
    /// shingle set. The field travels through configuration so deployments
    /// stay forward-compatible with a capping step.
    pub max_shingles: usize,
    /// Base of the polynomial shingle hash.
    pub base: u64,
    /// Width of the fingerprint domain; modulus is `1 << modulus_bits`.
    pub modulus_bits: u32,
    /// Permutation keys, one sketch slot each.
    ///
    /// Every key must fit inside the modulus so the XOR in the min-hash step
    /// never produces a value outside `[0, modulus)`.
    pub permutations: Vec<u64>,
    /// Enable parallel sketch-slot computation.
    pub use_parallel: bool,
}

impl SketchConfig {
    /// Fingerprint modulus derived from `modulus_bits`.
    #[inline]
    pub fn modulus(&self) -> u64 {
        1u64 << self.modulus_bits
    }

    /// Validate the configuration. Invalid configs are fatal at startup.
    pub fn validate(&self) -> Result<(), SketchError> {
        if self.shingle_length == 0 {
            return Err(SketchError::InvalidConfig(
                "shingle_length must be >= 1".into(),
            ));
        }
        if self.max_shingles == 0 {
            return Err(SketchError::InvalidConfig(
                "max_shingles must be >= 1".into(),
            ));
        }
        if self.base < 2 {
            return Err(SketchError::InvalidConfig("base must be >= 2".into()));
        }
        if self.modulus_bits == 0 || self.modulus_bits > 62 {
            return Err(SketchError::InvalidConfig(
                "modulus_bits must be in 1..=62".into(),
            ));
        }
        let modulus = self.modulus();
        if let Some(key) = self.permutations.iter().find(|&&p| p >= modulus) {
            return Err(SketchError::InvalidConfig(format!(
                "permutation key {key:#x} does not fit in a {}-bit modulus",
                self.modulus_bits
            )));
        }
        Ok(())
    }
}

impl Default for SketchConfig {
    fn default() -> Self {
        Self {
            shingle_length: 5,
            max_shingles: 5000,
            base: 1_000_003,
            modulus_bits: 61,
            permutations: DEFAULT_PERMUTATIONS.to_vec(),
            use_parallel: false,
        }
    }
}

/// Default permutation key family: 16 fixed keys inside a 61-bit modulus.
pub const DEFAULT_PERMUTATIONS: [u64; 16] = [
    0x1b87_54b1_07c3_a6d9,
    0x0f2e_9c81_553d_47ab,
    0x1c64_0b7d_92ef_8815,
    0x05d3_72a9_c1f8_3b67,
    0x13a9_ee05_7842_d1c3,
    0x1fd1_08c7_365a_92eb,
    0x0a4b_c5e3_8d19_70f7,
    0x1625_39bf_4ea7_085d,
    0x01f8_a64d_bc53_2e89,
    0x1d97_5021_69cd_fa4f,
    0x0c3a_81f5_2746_b9d1,
    0x18e2_4d6b_f05c_13a7,
    0x0764_b893_1ae5_cd2f,
    0x1453_07d9_85b2_6fe1,
    0x0ed8_f16a_43c9_507b,
    0x1a0c_2bf7_d681_94e3,
];

/// Configuration for source-identifier fingerprints.
///
/// Uses a smaller base/modulus than document sketches and no permutation
/// keys; the resulting fingerprint partitions the candidate index by source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceKeyConfig {
    /// Base of the polynomial hash over the source identifier.
    pub base: u64,
    /// Width of the fingerprint domain; modulus is `1 << modulus_bits`.
    pub modulus_bits: u32,
}

impl SourceKeyConfig {
    #[inline]
    pub fn modulus(&self) -> u64 {
        1u64 << self.modulus_bits
    }

    pub fn validate(&self) -> Result<(), SketchError> {
        if self.base < 2 {
            return Err(SketchError::InvalidConfig(
                "source base must be >= 2".into(),
            ));
        }
        if self.modulus_bits == 0 || self.modulus_bits > 62 {
            return Err(SketchError::InvalidConfig(
                "source modulus_bits must be in 1..=62".into(),
            ));
        }
        Ok(())
    }
}

impl Default for SourceKeyConfig {
    fn default() -> Self {
        Self {
            base: 31,
            modulus_bits: 31,
        }
    }
}

/// Errors returned by the shingling and sketching layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SketchError {
    #[error("invalid sketch config: {0}")]
    InvalidConfig(String),
}
