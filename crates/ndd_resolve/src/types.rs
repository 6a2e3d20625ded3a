use serde::{Deserialize, Serialize};
use thiserror::Error;

use ndd_shingle::SketchError;
use ndd_store::StoreError;

/// Configuration for the resolution stage.
///
/// `ResolverConfig` is cheap to clone and serde-friendly so it can be
/// embedded in a runtime config file alongside the sketch configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolverConfig {
    /// Fraction of sketch slots that must collide before a candidate is
    /// considered at all; the count threshold is
    /// `sketch_len * hash_collision_fraction`, compared strictly.
    #[serde(default = "ResolverConfig::default_hash_collision_fraction")]
    pub hash_collision_fraction: f64,
    /// Exact Jaccard similarity a candidate must strictly exceed during
    /// verification.
    #[serde(default = "ResolverConfig::default_overlap_threshold")]
    pub overlap_threshold: f64,
    /// How many days back the candidate search looks. Duplicates are only
    /// sought in recent history, not the full corpus.
    #[serde(default = "ResolverConfig::default_trailing_window_days")]
    pub trailing_window_days: u32,
}

impl ResolverConfig {
    pub(crate) fn default_hash_collision_fraction() -> f64 {
        0.4
    }

    pub(crate) fn default_overlap_threshold() -> f64 {
        0.75
    }

    pub(crate) fn default_trailing_window_days() -> u32 {
        2
    }

    /// Validate the configuration. Invalid values are fatal at startup.
    pub fn validate(&self) -> Result<(), ResolveError> {
        if !(self.hash_collision_fraction > 0.0 && self.hash_collision_fraction <= 1.0) {
            return Err(ResolveError::InvalidConfig(
                "hash_collision_fraction must be in (0.0, 1.0]".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.overlap_threshold) {
            return Err(ResolveError::InvalidConfig(
                "overlap_threshold must be in [0.0, 1.0)".into(),
            ));
        }
        Ok(())
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            hash_collision_fraction: Self::default_hash_collision_fraction(),
            overlap_threshold: Self::default_overlap_threshold(),
            trailing_window_days: Self::default_trailing_window_days(),
        }
    }
}

/// Errors produced by the resolution layer.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Invalid engine or resolver configuration.
    #[error("invalid resolver config: {0}")]
    InvalidConfig(String),
    /// Sketch configuration failed validation.
    #[error("sketch config error: {0}")]
    Sketch(#[from] SketchError),
    /// Store read or write failed; the article stays unresolved and is
    /// retried on a later batch.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
