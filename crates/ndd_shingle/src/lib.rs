//! ndd_shingle: shingling, fingerprinting, and min-hash sketching for
//! near-duplicate article detection.
//!
//! The crate is configuration-driven and pure: given the same text and
//! config, every function returns bit-identical results. No I/O, no global
//! state. Parallelism is an opt-in runtime flag, not a compile-time feature.

pub mod compare;
pub mod config;
pub mod fingerprint;
pub mod normalize;
pub mod shingles;
pub mod sketch;

pub use compare::{jaccard, similar};
pub use config::{SketchConfig, SketchError, SourceKeyConfig, DEFAULT_PERMUTATIONS};
pub use fingerprint::fingerprint;
pub use normalize::tokenize;
pub use shingles::{extract, extract_from_tokens};
pub use sketch::{generate, sketch_of_shingles, source_fingerprint};
