//! Batch driver: the outer polling loop that feeds articles through the
//! resolution engine.
//!
//! Articles are processed in `(published_at, id)` order. The candidate
//! window only looks backward in time, so this ordering is a correctness
//! requirement, not an optimization. One failure mode per article:
//! store errors leave the article unresolved for the next batch, anything
//! else degrades the article to original and the batch continues.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

use ndd_resolve::{ResolveError, Resolver};
use ndd_store::{ArticleRef, ArticleStore, Resolution};

use crate::PipelineError;

/// Runtime configuration for the batch driver.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Articles pulled per batch.
    pub batch_size: usize,
    /// Sleep between polls when the queue is empty.
    pub poll_interval: Duration,
    /// Emit a progress line every this many processed articles.
    pub log_every: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            poll_interval: Duration::from_secs(30),
            log_every: 100,
        }
    }
}

/// Counters for one driver pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriveStats {
    pub processed: u64,
    pub originals: u64,
    pub duplicates: u64,
    /// Articles left unresolved because the store failed mid-flight.
    pub deferred: u64,
}

/// Sequential batch driver over one store and one resolution engine.
///
/// A single driver is the single logical writer for its store; running two
/// drivers over one store partition would break the insert-before-query
/// ordering the engine relies on.
pub struct BatchDriver {
    store: Arc<ArticleStore>,
    engine: Box<dyn Resolver>,
    cfg: DriverConfig,
}

impl BatchDriver {
    pub fn new(store: Arc<ArticleStore>, engine: Box<dyn Resolver>, cfg: DriverConfig) -> Self {
        Self { store, engine, cfg }
    }

    /// Poll-and-process until `shutdown` flips to `true`.
    ///
    /// Shutdown is honored between batches and while sleeping, never
    /// mid-article.
    pub async fn run(
        &self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<DriveStats, PipelineError> {
        let mut total = DriveStats::default();
        let mut logged = 0u64;
        loop {
            if *shutdown.borrow() {
                break;
            }

            let pending = self.store.count_unresolved()?;
            if pending == 0 {
                tokio::select! {
                    _ = tokio::time::sleep(self.cfg.poll_interval) => {},
                    changed = shutdown.changed() => {
                        // A dropped sender counts as shutdown.
                        if changed.is_err() {
                            break;
                        }
                    },
                }
                continue;
            }

            let stats = self.run_batch()?;
            total.processed += stats.processed;
            total.originals += stats.originals;
            total.duplicates += stats.duplicates;
            total.deferred += stats.deferred;

            if total.processed - logged >= self.cfg.log_every {
                info!(
                    processed = total.processed,
                    duplicates = total.duplicates,
                    deferred = total.deferred,
                    pending,
                    "resolution progress"
                );
                logged = total.processed;
            }

            if stats.processed == 0 {
                // Every article in the batch deferred; back off instead of
                // spinning against a failing store.
                tokio::select! {
                    _ = tokio::time::sleep(self.cfg.poll_interval) => {},
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    },
                }
            }
        }
        info!(
            processed = total.processed,
            duplicates = total.duplicates,
            "driver stopped"
        );
        Ok(total)
    }

    /// Drain the unresolved queue without sleeping. Used by tests and the
    /// offline evaluation harness.
    pub fn drain(&self) -> Result<DriveStats, PipelineError> {
        let mut total = DriveStats::default();
        loop {
            let stats = self.run_batch()?;
            if stats.processed == 0 {
                break;
            }
            total.processed += stats.processed;
            total.originals += stats.originals;
            total.duplicates += stats.duplicates;
            total.deferred += stats.deferred;
        }
        Ok(total)
    }

    /// Process one batch in queue order.
    fn run_batch(&self) -> Result<DriveStats, PipelineError> {
        let mut stats = DriveStats::default();
        let batch = self.store.fetch_unresolved_batch(self.cfg.batch_size)?;
        for item in &batch {
            match self.resolve_one(item) {
                Ok(Some(resolution)) => {
                    stats.processed += 1;
                    if resolution.is_duplicate() {
                        stats.duplicates += 1;
                    } else {
                        stats.originals += 1;
                    }
                }
                Ok(None) => {
                    stats.processed += 1;
                    stats.originals += 1;
                }
                Err(err) => {
                    stats.deferred += 1;
                    warn!(
                        article_id = %item.id,
                        error = %err,
                        "store failed; article stays unresolved for the next batch"
                    );
                }
            }
        }
        Ok(stats)
    }

    /// Resolve a single queue entry.
    ///
    /// Returns `Ok(None)` when the article degraded to original through the
    /// fail-open path. Store errors bubble up so the article is retried.
    fn resolve_one(&self, item: &ArticleRef) -> Result<Option<Resolution>, ResolveError> {
        let article = match self.store.fetch_article(&item.id)? {
            Some(article) => article,
            None => {
                // Queue entry without a record; drop it so the queue drains.
                warn!(article_id = %item.id, "queued article has no stored record");
                self.store.remove_unresolved(item)?;
                return Ok(None);
            }
        };

        match self.engine.resolve_article(&article) {
            Ok(resolution) => Ok(Some(resolution)),
            Err(ResolveError::Store(err)) => Err(ResolveError::Store(err)),
            Err(err) => {
                // Fail open: an article the engine cannot judge becomes an
                // original rather than wedging the batch.
                warn!(
                    article_id = %article.id,
                    error = %err,
                    "resolution failed; degrading article to original"
                );
                self.store
                    .write_resolution(&article.id, &Resolution::Original)?;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDate;
    use ndd_resolve::{ResolutionEngine, ResolverConfig};
    use ndd_shingle::{SketchConfig, SourceKeyConfig};
    use ndd_store::Article;

    const FOX: &str = "the quick brown fox jumps over the lazy dog";

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn article(id: &str, text: &str, day: &str) -> Article {
        Article {
            id: id.to_string(),
            title: String::new(),
            text: text.to_string(),
            source_id: "s1".to_string(),
            published_at: date(day),
        }
    }

    fn test_driver() -> (Arc<ArticleStore>, BatchDriver) {
        let store = Arc::new(ArticleStore::in_memory());
        let engine = ResolutionEngine::new(
            store.clone(),
            SketchConfig {
                shingle_length: 3,
                ..Default::default()
            },
            SourceKeyConfig::default(),
            ResolverConfig::default(),
        )
        .expect("engine config is valid");
        let driver = BatchDriver::new(
            store.clone(),
            Box::new(engine),
            DriverConfig {
                batch_size: 2,
                ..Default::default()
            },
        );
        (store, driver)
    }

    #[test]
    fn drain_processes_in_date_order_across_batches() {
        let (store, driver) = test_driver();
        // Inserted out of order; the queue orders by (published_at, id).
        store.put_article(&article("dup", FOX, "2024-03-02")).unwrap();
        store.put_article(&article("orig", FOX, "2024-03-01")).unwrap();
        store
            .put_article(&article("other", "weather forecast shows rain tomorrow", "2024-03-01"))
            .unwrap();

        let stats = driver.drain().unwrap();
        assert_eq!(stats.processed, 3);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.originals, 2);
        assert_eq!(
            store.fetch_resolution("dup").unwrap(),
            Some(Resolution::DuplicateOf("orig".to_string()))
        );
    }

    #[test]
    fn orphaned_queue_entries_are_dropped() {
        let (store, driver) = test_driver();
        store.put_article(&article("real", FOX, "2024-03-01")).unwrap();
        // Simulate a queue entry whose record was lost.
        store
            .enqueue_unresolved(&ArticleRef {
                id: "ghost".to_string(),
                published_at: date("2024-03-01"),
            })
            .unwrap();

        let stats = driver.drain().unwrap();
        assert_eq!(store.count_unresolved().unwrap(), 0);
        assert_eq!(stats.deferred, 0);
        assert_eq!(
            store.fetch_resolution("real").unwrap(),
            Some(Resolution::Original)
        );
    }

    #[tokio::test]
    async fn run_stops_on_shutdown_signal() {
        let (store, driver) = test_driver();
        store.put_article(&article("a", FOX, "2024-03-01")).unwrap();

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move { driver.run(rx).await });

        // Give the driver a moment to drain the queue, then stop it.
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();

        let stats = handle.await.unwrap().unwrap();
        assert_eq!(stats.processed, 1);
        assert_eq!(store.count_unresolved().unwrap(), 0);
    }
}
