//! The article store: ingest queue, sketch-row index, resolution state.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use tracing::debug;

use crate::backend::{StoreBackend, WriteOp};
use crate::keys;
use crate::{
    Article, ArticleRef, CandidateArticle, CandidateHit, Resolution, StoreConfig, StoreError,
};

/// Persistent store behind the resolution pipeline.
///
/// One handle serves both logical roles, the read path (queue scans,
/// candidate queries, article fetches) and the write path (sketch-row
/// appends, resolution writes). Both backends give strict read-your-writes
/// on a single handle, which the pipeline relies on: an article's own sketch
/// rows are inserted before its candidate query runs, so the query always
/// sees a self-match.
pub struct ArticleStore {
    backend: Box<dyn StoreBackend>,
    cfg: StoreConfig,
}

impl ArticleStore {
    /// Open or create a store using the configured backend.
    pub fn open(cfg: StoreConfig) -> Result<Self, StoreError> {
        let backend = cfg.backend.build()?;
        Ok(Self::with_backend(cfg, backend))
    }

    /// Build a store with a custom backend (e.g. in-memory for tests).
    pub fn with_backend(cfg: StoreConfig, backend: Box<dyn StoreBackend>) -> Self {
        Self { backend, cfg }
    }

    /// Convenience constructor for an ephemeral in-memory store.
    pub fn in_memory() -> Self {
        Self::with_backend(
            StoreConfig::default().with_backend(crate::BackendConfig::in_memory()),
            Box::new(crate::InMemoryBackend::new()),
        )
    }

    /// Enqueue an article for resolution. Re-putting an unresolved article
    /// is a no-op rewrite; an already-resolved article is not re-queued.
    pub fn put_article(&self, article: &Article) -> Result<(), StoreError> {
        let mut batch = vec![WriteOp::Put {
            key: keys::doc_key(&article.id),
            value: self.encode(article)?,
        }];
        if self.fetch_resolution(&article.id)?.is_none() {
            batch.push(WriteOp::Put {
                key: keys::queue_key(article.published_at, &article.id),
                value: Vec::new(),
            });
        }
        self.backend.apply(batch)
    }

    /// Add a bare queue entry. `put_article` does this automatically;
    /// exposed for suppliers that stage queue entries separately.
    pub fn enqueue_unresolved(&self, item: &ArticleRef) -> Result<(), StoreError> {
        self.backend.apply(vec![WriteOp::Put {
            key: keys::queue_key(item.published_at, &item.id),
            value: Vec::new(),
        }])
    }

    /// Drop a queue entry without writing a resolution. Used to clear
    /// orphaned entries whose article record is gone.
    pub fn remove_unresolved(&self, item: &ArticleRef) -> Result<(), StoreError> {
        self.backend.apply(vec![WriteOp::Delete {
            key: keys::queue_key(item.published_at, &item.id),
        }])
    }

    /// Number of articles still awaiting resolution.
    pub fn count_unresolved(&self) -> Result<u64, StoreError> {
        let mut count = 0u64;
        self.backend.scan_range(
            keys::QUEUE_PREFIX,
            &keys::prefix_end(keys::QUEUE_PREFIX),
            &mut |_, _| {
                count += 1;
                Ok(true)
            },
        )?;
        Ok(count)
    }

    /// Up to `limit` unresolved articles in `(published_at, id)` order.
    pub fn fetch_unresolved_batch(&self, limit: usize) -> Result<Vec<ArticleRef>, StoreError> {
        let mut refs = Vec::new();
        if limit == 0 {
            return Ok(refs);
        }
        self.backend.scan_range(
            keys::QUEUE_PREFIX,
            &keys::prefix_end(keys::QUEUE_PREFIX),
            &mut |key, _| {
                let (published_at, id) = keys::parse_queue_key(key)?;
                refs.push(ArticleRef {
                    id: id.to_string(),
                    published_at,
                });
                Ok(refs.len() < limit)
            },
        )?;
        Ok(refs)
    }

    pub fn fetch_article(&self, id: &str) -> Result<Option<Article>, StoreError> {
        match self.backend.get(&keys::doc_key(id))? {
            Some(bytes) => Ok(Some(self.decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn fetch_resolution(&self, id: &str) -> Result<Option<Resolution>, StoreError> {
        match self.backend.get(&keys::state_key(id))? {
            Some(bytes) => Ok(Some(self.decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Join candidate ids with their article records and resolution states.
    /// Ids without a stored article are dropped.
    pub fn fetch_original_candidates(
        &self,
        ids: &[String],
    ) -> Result<Vec<CandidateArticle>, StoreError> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(article) = self.fetch_article(id)? {
                out.push(CandidateArticle {
                    resolution: self.fetch_resolution(id)?,
                    article,
                });
            }
        }
        Ok(out)
    }

    /// Append one row per sketch component, atomically.
    ///
    /// Rows are keyed on `(source_fp, hash, date, id)`, so repeated values
    /// within one sketch collapse and re-insertion after a crash is
    /// idempotent.
    pub fn insert_sketch(
        &self,
        article_id: &str,
        sketch: &[u64],
        published_at: NaiveDate,
        source_fp: i64,
    ) -> Result<(), StoreError> {
        if sketch.is_empty() {
            return Ok(());
        }
        let batch = sketch
            .iter()
            .map(|&hash| WriteOp::Put {
                key: keys::sketch_key(source_fp, hash, published_at, article_id),
                value: Vec::new(),
            })
            .collect();
        self.backend.apply(batch)
    }

    /// Count, per candidate article, how many of the query's distinct sketch
    /// values appear in that article's rows, restricted to the same source
    /// fingerprint and to publish dates in `[date_from, date_to]` inclusive.
    ///
    /// Results are ordered by match count descending, then article id
    /// ascending, so equal-count candidates rank deterministically.
    pub fn query_candidates(
        &self,
        sketch: &[u64],
        source_fp: i64,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<Vec<CandidateHit>, StoreError> {
        let distinct: HashSet<u64> = sketch.iter().copied().collect();
        let mut counts: HashMap<String, usize> = HashMap::new();
        for hash in distinct {
            let (start, end) = keys::sketch_range(source_fp, hash, date_from, date_to);
            self.backend.scan_range(&start, &end, &mut |key, _| {
                let id = keys::parse_sketch_key_id(key)?;
                *counts.entry(id.to_string()).or_insert(0) += 1;
                Ok(true)
            })?;
        }

        let mut hits: Vec<CandidateHit> = counts
            .into_iter()
            .map(|(article_id, match_count)| CandidateHit {
                article_id,
                match_count,
            })
            .collect();
        hits.sort_unstable_by(|a, b| {
            b.match_count
                .cmp(&a.match_count)
                .then_with(|| a.article_id.cmp(&b.article_id))
        });
        Ok(hits)
    }

    /// Persist the terminal resolution for an article and remove it from the
    /// unresolved queue, as one atomic batch.
    ///
    /// The transition is write-once: a resolution that is already stored is
    /// kept, and the call only clears any stale queue entry. This keeps
    /// crash-retry processing idempotent.
    pub fn write_resolution(
        &self,
        article_id: &str,
        resolution: &Resolution,
    ) -> Result<(), StoreError> {
        let existing = self.fetch_resolution(article_id)?;
        let mut batch = Vec::with_capacity(2);
        match existing {
            Some(prior) => {
                if prior != *resolution {
                    debug!(
                        article_id,
                        "resolution already written; keeping first decision"
                    );
                }
            }
            None => {
                batch.push(WriteOp::Put {
                    key: keys::state_key(article_id),
                    value: self.encode(resolution)?,
                });
            }
        }
        if let Some(article) = self.fetch_article(article_id)? {
            batch.push(WriteOp::Delete {
                key: keys::queue_key(article.published_at, article_id),
            });
        }
        self.backend.apply(batch)
    }

    /// Flush backend buffers if supported.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.backend.flush()
    }

    fn encode<T: serde::Serialize>(&self, value: &T) -> Result<Vec<u8>, StoreError> {
        let encoded = bincode::serialize(value)?;
        self.cfg.compression.compress(&encoded)
    }

    fn decode<T: serde::de::DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, StoreError> {
        let decompressed = self.cfg.compression.decompress(bytes)?;
        Ok(bincode::deserialize(&decompressed)?)
    }
}
