//! ndd_resolve: the resolution engine for near-duplicate article detection.
//!
//! Given an article and the sketch-row index, the engine elects an original
//! or marks the article itself original, in two stages: approximate candidate
//! generation by counting sketch-value collisions, then exact shingle-Jaccard
//! verification of the small surviving set. Every article passes through one
//! write-once transition, persisted exactly once.

mod engine;
mod metrics;
mod tiebreak;
mod types;

pub use engine::{ResolutionEngine, Resolver};
pub use metrics::{set_resolve_metrics, ResolveMetrics};
pub use tiebreak::{DescendingMatchCount, EarliestPublished, RankedCandidate, TieBreakPolicy};
pub use types::{ResolveError, ResolverConfig};
