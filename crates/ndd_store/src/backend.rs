use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::RwLock;

use crate::StoreError;

/// A single mutation applied through [`StoreBackend::apply`].
#[derive(Debug, Clone)]
pub enum WriteOp {
    Put { key: String, value: Vec<u8> },
    Delete { key: String },
}

/// Ordered key-value backend underneath the article store.
///
/// Implementations must apply a batch atomically and guarantee that a
/// committed batch is visible to every subsequent `get`/`scan_range` on the
/// same handle (read-after-write). Keys are scanned in lexicographic order.
pub trait StoreBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    /// Apply all operations as one atomic batch.
    fn apply(&self, batch: Vec<WriteOp>) -> Result<(), StoreError>;
    /// Visit `(key, value)` pairs with `start <= key < end` in key order.
    /// The visitor returns `false` to stop early.
    fn scan_range(
        &self,
        start: &str,
        end: &str,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<bool, StoreError>,
    ) -> Result<(), StoreError>;
    fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Backend selection, mirroring the store section of the runtime config.
#[derive(Clone, Debug)]
pub enum BackendConfig {
    Redb { path: String },
    InMemory,
}

impl BackendConfig {
    pub fn redb<P: Into<String>>(path: P) -> Self {
        BackendConfig::Redb { path: path.into() }
    }

    pub fn in_memory() -> Self {
        BackendConfig::InMemory
    }

    pub fn build(&self) -> Result<Box<dyn StoreBackend>, StoreError> {
        match self {
            BackendConfig::InMemory => Ok(Box::new(InMemoryBackend::new())),
            BackendConfig::Redb { path } => {
                #[cfg(feature = "backend-redb")]
                {
                    Ok(Box::new(RedbBackend::open(path)?))
                }
                #[cfg(not(feature = "backend-redb"))]
                {
                    let _ = path;
                    Err(StoreError::backend("redb backend disabled at compile time"))
                }
            }
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Redb {
            path: "data/newsdedup".into(),
        }
    }
}

/// Ordered in-memory backend for tests and the offline evaluation harness.
pub struct InMemoryBackend {
    records: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreBackend for InMemoryBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let guard = self
            .records
            .read()
            .map_err(|_| StoreError::backend("poisoned lock"))?;
        Ok(guard.get(key).cloned())
    }

    fn apply(&self, batch: Vec<WriteOp>) -> Result<(), StoreError> {
        let mut guard = self
            .records
            .write()
            .map_err(|_| StoreError::backend("poisoned lock"))?;
        for op in batch {
            match op {
                WriteOp::Put { key, value } => {
                    guard.insert(key, value);
                }
                WriteOp::Delete { key } => {
                    guard.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn scan_range(
        &self,
        start: &str,
        end: &str,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<bool, StoreError>,
    ) -> Result<(), StoreError> {
        let guard = self
            .records
            .read()
            .map_err(|_| StoreError::backend("poisoned lock"))?;
        let range = (
            Bound::Included(start.to_string()),
            Bound::Excluded(end.to_string()),
        );
        for (key, value) in guard.range(range) {
            if !visitor(key, value)? {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(feature = "backend-redb")]
mod redb_backend {
    use redb::{Database, ReadableTable, TableDefinition};

    use super::{StoreBackend, WriteOp};
    use crate::StoreError;

    const TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("newsdedup_v1");

    /// Embedded single-file backend.
    pub struct RedbBackend {
        db: Database,
    }

    impl RedbBackend {
        pub fn open(path: &str) -> Result<Self, StoreError> {
            let db = Database::create(path).map_err(StoreError::backend)?;
            // Make sure the table exists so read transactions never race
            // table creation.
            let txn = db.begin_write().map_err(StoreError::backend)?;
            txn.open_table(TABLE).map_err(StoreError::backend)?;
            txn.commit().map_err(StoreError::backend)?;
            Ok(Self { db })
        }
    }

    impl StoreBackend for RedbBackend {
        fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
            let txn = self.db.begin_read().map_err(StoreError::backend)?;
            let table = txn.open_table(TABLE).map_err(StoreError::backend)?;
            let value = table.get(key).map_err(StoreError::backend)?;
            Ok(value.map(|guard| guard.value().to_vec()))
        }

        fn apply(&self, batch: Vec<WriteOp>) -> Result<(), StoreError> {
            let txn = self.db.begin_write().map_err(StoreError::backend)?;
            {
                let mut table = txn.open_table(TABLE).map_err(StoreError::backend)?;
                for op in batch {
                    match op {
                        WriteOp::Put { key, value } => {
                            table
                                .insert(key.as_str(), value.as_slice())
                                .map_err(StoreError::backend)?;
                        }
                        WriteOp::Delete { key } => {
                            table.remove(key.as_str()).map_err(StoreError::backend)?;
                        }
                    }
                }
            }
            txn.commit().map_err(StoreError::backend)?;
            Ok(())
        }

        fn scan_range(
            &self,
            start: &str,
            end: &str,
            visitor: &mut dyn FnMut(&str, &[u8]) -> Result<bool, StoreError>,
        ) -> Result<(), StoreError> {
            let txn = self.db.begin_read().map_err(StoreError::backend)?;
            let table = txn.open_table(TABLE).map_err(StoreError::backend)?;
            for item in table.range(start..end).map_err(StoreError::backend)? {
                let (key, value) = item.map_err(StoreError::backend)?;
                if !visitor(key.value(), value.value())? {
                    break;
                }
            }
            Ok(())
        }
    }
}

#[cfg(feature = "backend-redb")]
pub use redb_backend::RedbBackend;

#[cfg(test)]
mod tests {
    use super::*;

    fn put(key: &str, value: &[u8]) -> WriteOp {
        WriteOp::Put {
            key: key.to_string(),
            value: value.to_vec(),
        }
    }

    #[test]
    fn in_memory_apply_and_get() {
        let backend = InMemoryBackend::new();
        backend
            .apply(vec![put("a/1", b"one"), put("a/2", b"two")])
            .unwrap();
        assert_eq!(backend.get("a/1").unwrap(), Some(b"one".to_vec()));
        assert_eq!(backend.get("a/3").unwrap(), None);

        backend
            .apply(vec![WriteOp::Delete {
                key: "a/1".to_string(),
            }])
            .unwrap();
        assert_eq!(backend.get("a/1").unwrap(), None);
    }

    #[test]
    fn in_memory_scan_is_ordered_and_bounded() {
        let backend = InMemoryBackend::new();
        backend
            .apply(vec![
                put("k/b", b"2"),
                put("k/a", b"1"),
                put("k/c", b"3"),
                put("l/a", b"out of range"),
            ])
            .unwrap();

        let mut seen = Vec::new();
        backend
            .scan_range("k/", "k0", &mut |key, _| {
                seen.push(key.to_string());
                Ok(true)
            })
            .unwrap();
        assert_eq!(seen, vec!["k/a", "k/b", "k/c"]);
    }

    #[test]
    fn scan_visitor_can_stop_early() {
        let backend = InMemoryBackend::new();
        backend
            .apply(vec![put("k/a", b"1"), put("k/b", b"2"), put("k/c", b"3")])
            .unwrap();

        let mut seen = 0usize;
        backend
            .scan_range("k/", "k0", &mut |_, _| {
                seen += 1;
                Ok(seen < 2)
            })
            .unwrap();
        assert_eq!(seen, 2);
    }

    #[cfg(feature = "backend-redb")]
    #[test]
    fn redb_backend_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.redb");
        let backend = RedbBackend::open(path.to_str().unwrap()).unwrap();

        backend
            .apply(vec![put("doc/a", b"alpha"), put("doc/b", b"bravo")])
            .unwrap();
        assert_eq!(backend.get("doc/a").unwrap(), Some(b"alpha".to_vec()));

        let mut seen = Vec::new();
        backend
            .scan_range("doc/", "doc0", &mut |key, value| {
                seen.push((key.to_string(), value.to_vec()));
                Ok(true)
            })
            .unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, "doc/a");
    }
}
