//! ndd_store: persistence for the near-duplicate detection pipeline.
//!
//! One store carries the three durable facts the pipeline needs: the article
//! records themselves (with an unresolved work queue ordered by publish date),
//! the append-only sketch-row index partitioned by source fingerprint, and
//! the write-once resolution state per article. The store guarantees
//! read-after-write visibility, so a sketch inserted for one article is seen
//! by the candidate query of the very next article.

mod backend;
mod keys;
mod store;

#[cfg(feature = "backend-redb")]
pub use backend::RedbBackend;
pub use backend::{BackendConfig, InMemoryBackend, StoreBackend, WriteOp};
pub use store::ArticleStore;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zstd::{decode_all, encode_all};

/// An immutable scraped article as handed over by the document supplier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub text: String,
    /// Identifier of the originating site/feed.
    pub source_id: String,
    pub published_at: NaiveDate,
}

impl Article {
    /// Canonical text used for shingling: title and body concatenated.
    pub fn canonical_text(&self) -> String {
        let mut text = String::with_capacity(self.title.len() + self.text.len() + 1);
        text.push_str(&self.title);
        text.push(' ');
        text.push_str(&self.text);
        text
    }
}

/// Lightweight handle to an unresolved article, in queue order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArticleRef {
    pub id: String,
    pub published_at: NaiveDate,
}

/// Terminal resolution state of an article.
///
/// Absence of a stored resolution means the article is still unresolved.
/// `DuplicateOf` always names an article whose own state is `Original`;
/// duplicates never chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Resolution {
    Original,
    DuplicateOf(String),
}

impl Resolution {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Resolution::DuplicateOf(_))
    }

    pub fn original_id(&self) -> Option<&str> {
        match self {
            Resolution::Original => None,
            Resolution::DuplicateOf(id) => Some(id.as_str()),
        }
    }
}

/// One candidate surfaced by the sketch-row index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateHit {
    pub article_id: String,
    /// Number of distinct query sketch values present in this article's rows.
    pub match_count: usize,
}

/// An article joined with its resolution state, for verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateArticle {
    pub article: Article,
    pub resolution: Option<Resolution>,
}

/// Compression codec options for stored records.
#[derive(Clone, Debug, Default)]
pub enum CompressionCodec {
    None,
    #[default]
    Zstd,
}

/// Compression behavior configuration.
#[derive(Clone, Debug)]
pub struct CompressionConfig {
    pub codec: CompressionCodec,
    pub level: i32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            codec: CompressionCodec::default(),
            level: 3,
        }
    }
}

impl CompressionConfig {
    pub(crate) fn compress(&self, data: &[u8]) -> Result<Vec<u8>, StoreError> {
        match self.codec {
            CompressionCodec::None => Ok(data.to_vec()),
            CompressionCodec::Zstd => Ok(encode_all(data, self.level)?),
        }
    }

    pub(crate) fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, StoreError> {
        match self.codec {
            CompressionCodec::None => Ok(data.to_vec()),
            CompressionCodec::Zstd => Ok(decode_all(data)?),
        }
    }
}

/// Config for opening the store.
#[derive(Clone, Debug, Default)]
pub struct StoreConfig {
    pub backend: BackendConfig,
    pub compression: CompressionConfig,
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_compression(mut self, compression: CompressionConfig) -> Self {
        self.compression = compression;
        self
    }
}

/// Errors surfaced by the store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("backend error: {0}")]
    Backend(String),
    #[error("serialization error: {0}")]
    Serde(#[from] bincode::Error),
    #[error("compression error: {0}")]
    Compression(#[from] std::io::Error),
    #[error("corrupt store key: {0}")]
    CorruptKey(String),
}

impl StoreError {
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }
}
