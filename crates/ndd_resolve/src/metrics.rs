// Metrics hooks for the resolution engine.
//
// Callers install a global `ResolveMetrics` implementation via
// [`set_resolve_metrics`]; the engine then reports every committed
// resolution. This keeps instrumentation decoupled from any specific
// metrics backend.
use std::sync::{Arc, RwLock};
use std::time::Duration;

use once_cell::sync::OnceCell;

use ndd_store::Resolution;

/// Metrics observer for resolution outcomes.
pub trait ResolveMetrics: Send + Sync {
    /// Record one committed resolution.
    ///
    /// `candidates_considered` is the number of candidates that survived the
    /// collision-count filter (excluding the article itself), and `latency`
    /// the wall-clock duration of the whole resolve call.
    fn record_resolution(
        &self,
        article_id: &str,
        resolution: &Resolution,
        latency: Duration,
        candidates_considered: usize,
    );
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn ResolveMetrics>>> {
    static METRICS: OnceCell<RwLock<Option<Arc<dyn ResolveMetrics>>>> = OnceCell::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

pub(crate) fn metrics_recorder() -> Option<Arc<dyn ResolveMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

/// Install or clear the global resolve metrics recorder.
///
/// Typically called once during startup so every engine instance shares the
/// same metrics backend.
pub fn set_resolve_metrics(recorder: Option<Arc<dyn ResolveMetrics>>) {
    let lock = metrics_lock();
    let mut guard = lock.write().expect("resolve metrics lock poisoned");
    *guard = recorder;
}
