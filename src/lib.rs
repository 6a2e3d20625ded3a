//! Workspace umbrella crate for the near-duplicate article detection engine.
//!
//! Stitches together sketch generation, the persistent candidate index, and
//! the resolution state machine so callers can stand up the whole pipeline
//! from one configuration file. The scraping side stays external: it feeds
//! articles into the store, and this crate decides which of them are
//! duplicates of which.

pub mod config;
pub mod driver;
pub mod eval;

pub use ndd_resolve::{
    set_resolve_metrics, DescendingMatchCount, EarliestPublished, RankedCandidate,
    ResolutionEngine, ResolveError, ResolveMetrics, Resolver, ResolverConfig, TieBreakPolicy,
};
pub use ndd_shingle::{
    fingerprint, generate, jaccard, similar, source_fingerprint, tokenize, SketchConfig,
    SketchError, SourceKeyConfig, DEFAULT_PERMUTATIONS,
};
pub use ndd_store::{
    Article, ArticleRef, ArticleStore, BackendConfig, CandidateArticle, CandidateHit,
    CompressionCodec, CompressionConfig, Resolution, StoreConfig, StoreError,
};

pub use config::{AppConfig, ConfigLoadError};
pub use driver::{BatchDriver, DriveStats, DriverConfig};

use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while running the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("sketch failure: {0}")]
    Sketch(#[from] SketchError),
    #[error("store failure: {0}")]
    Store(#[from] StoreError),
    #[error("resolution failure: {0}")]
    Resolve(#[from] ResolveError),
    #[error("configuration failure: {0}")]
    Config(#[from] ConfigLoadError),
}

/// Compute an article's sketch from its canonical (title + body) text.
pub fn sketch_article(article: &Article, cfg: &SketchConfig) -> Vec<u64> {
    ndd_shingle::generate(&article.canonical_text(), cfg)
}

/// Build the production pipeline from a validated configuration: open the
/// store, construct the engine, and wrap both in a batch driver.
pub fn build_pipeline(cfg: &AppConfig) -> Result<(Arc<ArticleStore>, BatchDriver), PipelineError> {
    cfg.validate()?;
    let store = Arc::new(ArticleStore::open(cfg.store_config())?);
    let engine = ResolutionEngine::new(
        store.clone(),
        cfg.sketch_config(),
        cfg.source_config(),
        cfg.resolver_config(),
    )?;
    let driver = BatchDriver::new(store.clone(), Box::new(engine), cfg.driver_config());
    Ok((store, driver))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_article() -> Article {
        Article {
            id: "a".to_string(),
            title: "Quarterly results beat analyst expectations".to_string(),
            text: "stocks rally on strong quarterly earnings data".to_string(),
            source_id: "s1".to_string(),
            published_at: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        }
    }

    #[test]
    fn sketch_article_covers_title_and_body() {
        let cfg = SketchConfig {
            shingle_length: 3,
            ..Default::default()
        };
        let with_title = sketch_article(&sample_article(), &cfg);
        let body_only = ndd_shingle::generate(&sample_article().text, &cfg);
        assert_eq!(with_title.len(), cfg.permutations.len());
        assert_ne!(with_title, body_only);
    }

    #[test]
    fn build_pipeline_rejects_invalid_config() {
        let yaml = r#"
version: "1.0"
store:
  backend: "in_memory"
"#;
        let mut cfg = AppConfig::from_yaml(yaml).unwrap();
        cfg.sketch.permutations.clear();
        assert!(matches!(
            build_pipeline(&cfg),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn build_pipeline_with_in_memory_store() {
        let yaml = r#"
version: "1.0"
store:
  backend: "in_memory"
"#;
        let cfg = AppConfig::from_yaml(yaml).unwrap();
        let (store, driver) = build_pipeline(&cfg).unwrap();
        store.put_article(&sample_article()).unwrap();
        let stats = driver.drain().unwrap();
        assert_eq!(stats.processed, 1);
        assert_eq!(
            store.fetch_resolution("a").unwrap(),
            Some(Resolution::Original)
        );
    }
}
