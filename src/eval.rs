//! Offline evaluation harness for threshold tuning.
//!
//! Replays a labeled corpus through an ephemeral in-memory pipeline and
//! reports binary classification quality for the duplicate decision. A grid
//! search over the four tunable thresholds ranks parameter combinations by a
//! composite score: the harmonic mean of the duplicate-class and
//! original-class F1 scores, so a degenerate all-original or all-duplicate
//! classifier scores zero. This tool consumes the same core components as
//! the production pipeline but never its store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use ndd_resolve::{ResolutionEngine, Resolver, ResolverConfig};
use ndd_shingle::{SketchConfig, SourceKeyConfig};
use ndd_store::{Article, ArticleStore};

use crate::PipelineError;

/// A corpus entry with its ground-truth label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledArticle {
    #[serde(flatten)]
    pub article: Article,
    /// Id of the original this article duplicates, if any.
    #[serde(default)]
    pub duplicate_of: Option<String>,
}

/// Binary classification counters for one positive class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BinaryStats {
    pub true_positives: u64,
    pub false_positives: u64,
    pub false_negatives: u64,
    pub true_negatives: u64,
}

impl BinaryStats {
    pub fn record(&mut self, predicted: bool, actual: bool) {
        match (predicted, actual) {
            (true, true) => self.true_positives += 1,
            (true, false) => self.false_positives += 1,
            (false, true) => self.false_negatives += 1,
            (false, false) => self.true_negatives += 1,
        }
    }

    pub fn precision(&self) -> f64 {
        ratio(
            self.true_positives,
            self.true_positives + self.false_positives,
        )
    }

    pub fn recall(&self) -> f64 {
        ratio(
            self.true_positives,
            self.true_positives + self.false_negatives,
        )
    }

    pub fn f1(&self) -> f64 {
        harmonic_mean(self.precision(), self.recall())
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn harmonic_mean(a: f64, b: f64) -> f64 {
    if a + b == 0.0 {
        0.0
    } else {
        2.0 * a * b / (a + b)
    }
}

/// The tunable parameters one evaluation ran with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvalParams {
    pub shingle_length: usize,
    pub permutation_count: usize,
    pub hash_collision_fraction: f64,
    pub overlap_threshold: f64,
}

/// Quality report for one parameter combination.
#[derive(Debug, Clone)]
pub struct EvalReport {
    pub params: EvalParams,
    /// Stats with "is a duplicate" as the positive class.
    pub duplicate: BinaryStats,
    /// Stats with "is an original" as the positive class.
    pub original: BinaryStats,
}

impl EvalReport {
    /// Harmonic mean of the two per-class F1 scores.
    pub fn composite(&self) -> f64 {
        harmonic_mean(self.duplicate.f1(), self.original.f1())
    }
}

/// Replay the corpus through a fresh in-memory pipeline with the given
/// configuration and score the duplicate decisions against the labels.
pub fn evaluate(
    corpus: &[LabeledArticle],
    sketch_cfg: SketchConfig,
    source_cfg: SourceKeyConfig,
    resolver_cfg: ResolverConfig,
) -> Result<EvalReport, PipelineError> {
    let params = EvalParams {
        shingle_length: sketch_cfg.shingle_length,
        permutation_count: sketch_cfg.permutations.len(),
        hash_collision_fraction: resolver_cfg.hash_collision_fraction,
        overlap_threshold: resolver_cfg.overlap_threshold,
    };

    let store = Arc::new(ArticleStore::in_memory());
    let engine = ResolutionEngine::new(store.clone(), sketch_cfg, source_cfg, resolver_cfg)?;

    // The production queue orders by (published_at, id); replay the same way.
    let mut ordered: Vec<&LabeledArticle> = corpus.iter().collect();
    ordered.sort_by(|a, b| {
        a.article
            .published_at
            .cmp(&b.article.published_at)
            .then_with(|| a.article.id.cmp(&b.article.id))
    });

    let mut duplicate = BinaryStats::default();
    let mut original = BinaryStats::default();
    for entry in ordered {
        store.put_article(&entry.article)?;
        let resolution = engine.resolve_article(&entry.article)?;
        let predicted_dup = resolution.is_duplicate();
        let actual_dup = entry.duplicate_of.is_some();
        duplicate.record(predicted_dup, actual_dup);
        original.record(!predicted_dup, !actual_dup);
    }

    debug!(
        ?params,
        duplicate_f1 = duplicate.f1(),
        original_f1 = original.f1(),
        "evaluated parameter combination"
    );
    Ok(EvalReport {
        params,
        duplicate,
        original,
    })
}

/// Parameter grid for [`grid_search`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSpace {
    pub shingle_lengths: Vec<usize>,
    pub hash_collision_fractions: Vec<f64>,
    pub overlap_thresholds: Vec<f64>,
}

impl Default for GridSpace {
    fn default() -> Self {
        Self {
            shingle_lengths: vec![3, 5, 7],
            hash_collision_fractions: vec![0.2, 0.4, 0.6],
            overlap_thresholds: vec![0.5, 0.75, 0.9],
        }
    }
}

/// Evaluate every combination in the grid and return the reports ranked by
/// composite score, best first.
pub fn grid_search(
    corpus: &[LabeledArticle],
    base_sketch: &SketchConfig,
    source_cfg: SourceKeyConfig,
    base_resolver: &ResolverConfig,
    space: &GridSpace,
) -> Result<Vec<EvalReport>, PipelineError> {
    let mut reports = Vec::new();
    for &shingle_length in &space.shingle_lengths {
        for &hash_collision_fraction in &space.hash_collision_fractions {
            for &overlap_threshold in &space.overlap_thresholds {
                let sketch_cfg = SketchConfig {
                    shingle_length,
                    ..base_sketch.clone()
                };
                let resolver_cfg = ResolverConfig {
                    hash_collision_fraction,
                    overlap_threshold,
                    ..base_resolver.clone()
                };
                reports.push(evaluate(corpus, sketch_cfg, source_cfg, resolver_cfg)?);
            }
        }
    }
    reports.sort_by(|a, b| {
        b.composite()
            .partial_cmp(&a.composite())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(reports)
}
