use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Duration;
use tracing::{debug, warn};

use ndd_shingle::{compare, sketch, SketchConfig, SourceKeyConfig};
use ndd_store::{Article, ArticleStore, CandidateHit, Resolution};

use crate::metrics::metrics_recorder;
use crate::tiebreak::{DescendingMatchCount, RankedCandidate, TieBreakPolicy};
use crate::types::{ResolveError, ResolverConfig};

/// Trait for a resolution engine.
pub trait Resolver: Send + Sync {
    /// Resolve a single article to its terminal state and persist the
    /// decision.
    fn resolve_article(&self, article: &Article) -> Result<Resolution, ResolveError>;
}

/// Production resolution engine.
///
/// Each article moves through one write-once transition:
/// unresolved -> original | duplicate-of. The engine inserts the article's
/// sketch rows before querying, so the index stays complete for every later
/// article even when this one turns out to be a duplicate; callers see the
/// resulting self-match accounted for below.
pub struct ResolutionEngine {
    store: Arc<ArticleStore>,
    sketch_cfg: SketchConfig,
    source_cfg: SourceKeyConfig,
    resolver_cfg: ResolverConfig,
    tiebreak: Box<dyn TieBreakPolicy>,
}

impl ResolutionEngine {
    /// Construct an engine with the default tie-break policy.
    pub fn new(
        store: Arc<ArticleStore>,
        sketch_cfg: SketchConfig,
        source_cfg: SourceKeyConfig,
        resolver_cfg: ResolverConfig,
    ) -> Result<Self, ResolveError> {
        Self::with_policy(
            store,
            sketch_cfg,
            source_cfg,
            resolver_cfg,
            Box::new(DescendingMatchCount),
        )
    }

    /// Construct an engine with an explicit tie-break policy.
    pub fn with_policy(
        store: Arc<ArticleStore>,
        sketch_cfg: SketchConfig,
        source_cfg: SourceKeyConfig,
        resolver_cfg: ResolverConfig,
        tiebreak: Box<dyn TieBreakPolicy>,
    ) -> Result<Self, ResolveError> {
        sketch_cfg.validate()?;
        source_cfg.validate()?;
        resolver_cfg.validate()?;
        if sketch_cfg.permutations.is_empty() {
            return Err(ResolveError::InvalidConfig(
                "at least one permutation key is required".into(),
            ));
        }
        Ok(Self {
            store,
            sketch_cfg,
            source_cfg,
            resolver_cfg,
            tiebreak,
        })
    }

    /// Candidates that survive the collision-count filter, including the
    /// article's own self-match.
    fn surviving_candidates(
        &self,
        hits: Vec<CandidateHit>,
        sketch_len: usize,
    ) -> Vec<CandidateHit> {
        let count_threshold = sketch_len as f64 * self.resolver_cfg.hash_collision_fraction;
        hits.into_iter()
            .filter(|hit| hit.match_count as f64 > count_threshold)
            .collect()
    }

    /// Join surviving candidates with their records, keeping only those
    /// whose own state is `Original`. An unresolved or already-duplicate
    /// candidate is never elected, so duplicates cannot chain. Fetch
    /// failures skip that candidate rather than aborting the article.
    fn ranked_originals(&self, others: &[CandidateHit]) -> Vec<RankedCandidate> {
        let counts: HashMap<&str, usize> = others
            .iter()
            .map(|hit| (hit.article_id.as_str(), hit.match_count))
            .collect();

        let mut ranked = Vec::with_capacity(others.len());
        for hit in others {
            match self
                .store
                .fetch_original_candidates(std::slice::from_ref(&hit.article_id))
            {
                Ok(joined) => {
                    for candidate in joined {
                        if matches!(candidate.resolution, Some(Resolution::Original)) {
                            let match_count =
                                counts.get(candidate.article.id.as_str()).copied().unwrap_or(0);
                            ranked.push(RankedCandidate {
                                article: candidate.article,
                                match_count,
                            });
                        }
                    }
                }
                Err(err) => {
                    warn!(
                        candidate = %hit.article_id,
                        error = %err,
                        "skipping candidate whose record could not be fetched"
                    );
                }
            }
        }
        self.tiebreak.order(&mut ranked);
        ranked
    }

    fn commit(
        &self,
        article: &Article,
        resolution: Resolution,
        candidates_considered: usize,
        started: Instant,
    ) -> Result<Resolution, ResolveError> {
        self.store.write_resolution(&article.id, &resolution)?;
        debug!(
            article_id = %article.id,
            duplicate = resolution.is_duplicate(),
            original_id = resolution.original_id().unwrap_or_default(),
            candidates = candidates_considered,
            policy = self.tiebreak.name(),
            "resolution committed"
        );
        if let Some(recorder) = metrics_recorder() {
            recorder.record_resolution(
                &article.id,
                &resolution,
                started.elapsed(),
                candidates_considered,
            );
        }
        Ok(resolution)
    }
}

impl Resolver for ResolutionEngine {
    fn resolve_article(&self, article: &Article) -> Result<Resolution, ResolveError> {
        let started = Instant::now();
        let text = article.canonical_text();

        // Articles too short to shingle carry no signature and cannot be
        // deduplicated; they become originals without touching the index.
        let article_sketch = sketch::generate(&text, &self.sketch_cfg);
        if article_sketch.is_empty() {
            return self.commit(article, Resolution::Original, 0, started);
        }

        let source_fp = sketch::source_fingerprint(&article.source_id, &self.source_cfg);

        // Index first, query second. The insert always happens, even when
        // this article ends up a duplicate, so later articles can match
        // against it; the query below therefore includes a self-match.
        self.store.insert_sketch(
            &article.id,
            &article_sketch,
            article.published_at,
            source_fp,
        )?;

        let date_from = article
            .published_at
            .checked_sub_signed(Duration::days(i64::from(
                self.resolver_cfg.trailing_window_days,
            )))
            .unwrap_or(chrono::NaiveDate::MIN);
        let hits = self.store.query_candidates(
            &article_sketch,
            source_fp,
            date_from,
            article.published_at,
        )?;

        let surviving = self.surviving_candidates(hits, article_sketch.len());
        if surviving.len() <= 1 {
            // Nothing beyond the article's own self-match.
            return self.commit(article, Resolution::Original, 0, started);
        }

        let others: Vec<CandidateHit> = surviving
            .into_iter()
            .filter(|hit| hit.article_id != article.id)
            .collect();
        let candidates_considered = others.len();

        for candidate in self.ranked_originals(&others) {
            let verified = compare::similar(
                &text,
                &candidate.article.canonical_text(),
                self.sketch_cfg.shingle_length,
                self.resolver_cfg.overlap_threshold,
            );
            if verified {
                return self.commit(
                    article,
                    Resolution::DuplicateOf(candidate.article.id),
                    candidates_considered,
                    started,
                );
            }
        }

        self.commit(article, Resolution::Original, candidates_considered, started)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::RwLock;
    use std::time::Duration as StdDuration;

    use chrono::NaiveDate;

    use crate::metrics::{set_resolve_metrics, ResolveMetrics};

    const FOX: &str = "the quick brown fox jumps over the lazy dog";

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn article(id: &str, text: &str, source_id: &str, day: &str) -> Article {
        Article {
            id: id.to_string(),
            title: String::new(),
            text: text.to_string(),
            source_id: source_id.to_string(),
            published_at: date(day),
        }
    }

    fn test_engine() -> (Arc<ArticleStore>, ResolutionEngine) {
        let store = Arc::new(ArticleStore::in_memory());
        let sketch_cfg = SketchConfig {
            shingle_length: 3,
            ..Default::default()
        };
        let engine = ResolutionEngine::new(
            store.clone(),
            sketch_cfg,
            SourceKeyConfig::default(),
            ResolverConfig::default(),
        )
        .expect("engine config is valid");
        (store, engine)
    }

    fn ingest_and_resolve(
        store: &ArticleStore,
        engine: &ResolutionEngine,
        article: &Article,
    ) -> Resolution {
        store.put_article(article).expect("put article");
        engine.resolve_article(article).expect("resolve article")
    }

    #[test]
    fn identical_later_article_resolves_to_duplicate() {
        let (store, engine) = test_engine();
        let a = article("a", FOX, "s1", "2024-03-01");
        let b = article("b", FOX, "s1", "2024-03-02");

        assert_eq!(ingest_and_resolve(&store, &engine, &a), Resolution::Original);
        assert_eq!(
            ingest_and_resolve(&store, &engine, &b),
            Resolution::DuplicateOf("a".to_string())
        );
    }

    #[test]
    fn disjoint_texts_stay_original() {
        let (store, engine) = test_engine();
        let a = article("a", "stocks rally on earnings", "s1", "2024-03-01");
        let b = article(
            "b",
            "weather forecast shows rain tomorrow",
            "s1",
            "2024-03-01",
        );

        assert_eq!(ingest_and_resolve(&store, &engine, &a), Resolution::Original);
        assert_eq!(ingest_and_resolve(&store, &engine, &b), Resolution::Original);
    }

    #[test]
    fn identical_texts_across_sources_never_match() {
        let (store, engine) = test_engine();
        let a = article("a", FOX, "reuters", "2024-03-01");
        let b = article("b", FOX, "bloomberg", "2024-03-01");

        assert_eq!(ingest_and_resolve(&store, &engine, &a), Resolution::Original);
        assert_eq!(ingest_and_resolve(&store, &engine, &b), Resolution::Original);
    }

    #[test]
    fn too_short_article_is_original_without_index_rows() {
        let (store, engine) = test_engine();
        let stub = article("stub", "too short", "s1", "2024-03-01");
        assert_eq!(
            ingest_and_resolve(&store, &engine, &stub),
            Resolution::Original
        );

        // Nothing was indexed, so a later identical stub is original too.
        let stub2 = article("stub2", "too short", "s1", "2024-03-02");
        assert_eq!(
            ingest_and_resolve(&store, &engine, &stub2),
            Resolution::Original
        );
    }

    #[test]
    fn duplicates_never_chain() {
        let (store, engine) = test_engine();
        let a = article("a", FOX, "s1", "2024-03-01");
        let b = article("b", FOX, "s1", "2024-03-02");
        let c = article("c", FOX, "s1", "2024-03-03");

        ingest_and_resolve(&store, &engine, &a);
        assert_eq!(
            ingest_and_resolve(&store, &engine, &b),
            Resolution::DuplicateOf("a".to_string())
        );
        // Both a and b collide with c, but b is itself a duplicate and is
        // never elected.
        assert_eq!(
            ingest_and_resolve(&store, &engine, &c),
            Resolution::DuplicateOf("a".to_string())
        );
    }

    #[test]
    fn window_boundary_is_exclusive() {
        let (store, engine) = test_engine();
        let a = article("a", FOX, "s1", "2024-03-01");
        // Published trailing_window_days + 1 after the original.
        let late = article("late", FOX, "s1", "2024-03-04");
        let inside = article("inside", FOX, "s1", "2024-03-03");

        ingest_and_resolve(&store, &engine, &a);
        assert_eq!(
            ingest_and_resolve(&store, &engine, &late),
            Resolution::Original
        );
        assert_eq!(
            ingest_and_resolve(&store, &engine, &inside),
            Resolution::DuplicateOf("a".to_string())
        );
    }

    #[test]
    fn unresolved_candidate_is_never_elected() {
        let (store, engine) = test_engine();
        let ghost = article("ghost", FOX, "s1", "2024-03-01");
        // The ghost's rows are indexed but it never received a resolution.
        store.put_article(&ghost).unwrap();
        let ghost_sketch = sketch::generate(
            &ghost.canonical_text(),
            &SketchConfig {
                shingle_length: 3,
                ..Default::default()
            },
        );
        let fp = sketch::source_fingerprint("s1", &SourceKeyConfig::default());
        store
            .insert_sketch("ghost", &ghost_sketch, ghost.published_at, fp)
            .unwrap();

        let d = article("d", FOX, "s1", "2024-03-02");
        assert_eq!(ingest_and_resolve(&store, &engine, &d), Resolution::Original);
    }

    #[test]
    fn empty_permutation_list_is_rejected_at_construction() {
        let store = Arc::new(ArticleStore::in_memory());
        let cfg = SketchConfig {
            shingle_length: 3,
            permutations: Vec::new(),
            ..Default::default()
        };
        let result = ResolutionEngine::new(
            store,
            cfg,
            SourceKeyConfig::default(),
            ResolverConfig::default(),
        );
        assert!(matches!(result, Err(ResolveError::InvalidConfig(_))));
    }

    struct RecordingMetrics {
        events: RwLock<Vec<(String, bool, usize)>>,
    }

    impl ResolveMetrics for RecordingMetrics {
        fn record_resolution(
            &self,
            article_id: &str,
            resolution: &Resolution,
            _latency: StdDuration,
            candidates_considered: usize,
        ) {
            self.events.write().unwrap().push((
                article_id.to_string(),
                resolution.is_duplicate(),
                candidates_considered,
            ));
        }
    }

    #[test]
    fn metrics_recorder_observes_resolutions() {
        let (store, engine) = test_engine();
        let metrics = Arc::new(RecordingMetrics {
            events: RwLock::new(Vec::new()),
        });
        set_resolve_metrics(Some(metrics.clone()));

        ingest_and_resolve(&store, &engine, &article("met-a", FOX, "s1", "2024-03-01"));
        ingest_and_resolve(&store, &engine, &article("met-b", FOX, "s1", "2024-03-02"));

        let events = metrics.events.read().unwrap().clone();
        set_resolve_metrics(None);

        // The recorder is process-global, so other tests may add events;
        // assert only on the ones this test produced.
        let ours: Vec<_> = events.iter().filter(|e| e.0.starts_with("met-")).collect();
        assert_eq!(ours.len(), 2);
        assert_eq!(*ours[0], ("met-a".to_string(), false, 0));
        assert_eq!(*ours[1], ("met-b".to_string(), true, 1));
    }
}
