//! YAML configuration file support for the dedup pipeline.
//!
//! All stage configurations (sketch, source partitioning, resolver, store,
//! driver) live in a single YAML file loaded at startup. Every field has a
//! default, so a minimal file only needs a `version`.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "production"
//!
//! sketch:
//!   shingle_length: 5
//!   max_shingles: 5000
//!   base: 1000003
//!   modulus_bits: 61
//!   use_parallel: false
//!
//! source:
//!   base: 31
//!   modulus_bits: 31
//!
//! resolver:
//!   hash_collision_fraction: 0.4
//!   overlap_threshold: 0.75
//!   trailing_window_days: 2
//!
//! store:
//!   backend: "redb"
//!   path: "data/newsdedup"
//!   compression: "zstd"
//!
//! driver:
//!   batch_size: 100
//!   poll_interval_secs: 30
//!   log_every: 100
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ndd_resolve::ResolverConfig;
use ndd_shingle::{SketchConfig, SourceKeyConfig, DEFAULT_PERMUTATIONS};
use ndd_store::{BackendConfig, CompressionCodec, CompressionConfig, StoreConfig};

use crate::driver::DriverConfig;

/// Errors that can occur when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level YAML configuration for the whole pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AppConfig {
    /// Configuration format version.
    pub version: String,

    /// Optional configuration name/description.
    #[serde(default)]
    pub name: Option<String>,

    /// Log filter for the daemon (overridable via `RUST_LOG`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub sketch: SketchYamlConfig,

    #[serde(default)]
    pub source: SourceYamlConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub store: StoreYamlConfig,

    #[serde(default)]
    pub driver: DriverYamlConfig,
}

impl AppConfig {
    /// Load a YAML configuration file from the given path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: AppConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration. Any failure is fatal at startup.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.sketch_config()
            .validate()
            .map_err(|e| ConfigLoadError::Validation(e.to_string()))?;
        if self.sketch.permutations.is_empty() {
            return Err(ConfigLoadError::Validation(
                "sketch.permutations must not be empty".to_string(),
            ));
        }
        self.source_config()
            .validate()
            .map_err(|e| ConfigLoadError::Validation(e.to_string()))?;
        self.resolver
            .validate()
            .map_err(|e| ConfigLoadError::Validation(e.to_string()))?;
        self.store.validate()?;
        self.driver.validate()?;
        Ok(())
    }

    pub fn sketch_config(&self) -> SketchConfig {
        SketchConfig {
            shingle_length: self.sketch.shingle_length,
            max_shingles: self.sketch.max_shingles,
            base: self.sketch.base,
            modulus_bits: self.sketch.modulus_bits,
            permutations: self.sketch.permutations.clone(),
            use_parallel: self.sketch.use_parallel,
        }
    }

    pub fn source_config(&self) -> SourceKeyConfig {
        SourceKeyConfig {
            base: self.source.base,
            modulus_bits: self.source.modulus_bits,
        }
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        self.resolver.clone()
    }

    pub fn store_config(&self) -> StoreConfig {
        let backend = match self.store.backend.as_str() {
            "in_memory" => BackendConfig::in_memory(),
            _ => BackendConfig::redb(self.store.path.clone()),
        };
        let codec = match self.store.compression.as_str() {
            "none" => CompressionCodec::None,
            _ => CompressionCodec::Zstd,
        };
        StoreConfig::new()
            .with_backend(backend)
            .with_compression(CompressionConfig {
                codec,
                level: self.store.compression_level,
            })
    }

    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            batch_size: self.driver.batch_size,
            poll_interval: std::time::Duration::from_secs(self.driver.poll_interval_secs),
            log_every: self.driver.log_every,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            log_level: default_log_level(),
            sketch: SketchYamlConfig::default(),
            source: SourceYamlConfig::default(),
            resolver: ResolverConfig::default(),
            store: StoreYamlConfig::default(),
            driver: DriverYamlConfig::default(),
        }
    }
}

/// Sketch stage YAML configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SketchYamlConfig {
    #[serde(default = "default_shingle_length")]
    pub shingle_length: usize,

    #[serde(default = "default_max_shingles")]
    pub max_shingles: usize,

    #[serde(default = "default_base")]
    pub base: u64,

    #[serde(default = "default_modulus_bits")]
    pub modulus_bits: u32,

    #[serde(default = "default_permutations")]
    pub permutations: Vec<u64>,

    #[serde(default)]
    pub use_parallel: bool,
}

impl Default for SketchYamlConfig {
    fn default() -> Self {
        Self {
            shingle_length: default_shingle_length(),
            max_shingles: default_max_shingles(),
            base: default_base(),
            modulus_bits: default_modulus_bits(),
            permutations: default_permutations(),
            use_parallel: false,
        }
    }
}

/// Source partitioning YAML configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceYamlConfig {
    #[serde(default = "default_source_base")]
    pub base: u64,

    #[serde(default = "default_source_modulus_bits")]
    pub modulus_bits: u32,
}

impl Default for SourceYamlConfig {
    fn default() -> Self {
        Self {
            base: default_source_base(),
            modulus_bits: default_source_modulus_bits(),
        }
    }
}

/// Store YAML configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreYamlConfig {
    #[serde(default = "default_store_backend")]
    pub backend: String,

    #[serde(default = "default_store_path")]
    pub path: String,

    #[serde(default = "default_compression")]
    pub compression: String,

    #[serde(default = "default_compression_level")]
    pub compression_level: i32,
}

impl StoreYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        let valid_backends = ["in_memory", "redb"];
        if !valid_backends.contains(&self.backend.as_str()) {
            return Err(ConfigLoadError::Validation(format!(
                "store.backend must be one of: {valid_backends:?}"
            )));
        }
        let valid_codecs = ["none", "zstd"];
        if !valid_codecs.contains(&self.compression.as_str()) {
            return Err(ConfigLoadError::Validation(format!(
                "store.compression must be one of: {valid_codecs:?}"
            )));
        }
        Ok(())
    }
}

impl Default for StoreYamlConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: default_store_path(),
            compression: default_compression(),
            compression_level: default_compression_level(),
        }
    }
}

/// Batch driver YAML configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverYamlConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_log_every")]
    pub log_every: u64,
}

impl DriverYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.batch_size == 0 {
            return Err(ConfigLoadError::Validation(
                "driver.batch_size must be >= 1".to_string(),
            ));
        }
        if self.log_every == 0 {
            return Err(ConfigLoadError::Validation(
                "driver.log_every must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for DriverYamlConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            poll_interval_secs: default_poll_interval_secs(),
            log_every: default_log_every(),
        }
    }
}

// Helper functions for serde defaults
fn default_log_level() -> String {
    "info".to_string()
}
fn default_shingle_length() -> usize {
    5
}
fn default_max_shingles() -> usize {
    5000
}
fn default_base() -> u64 {
    1_000_003
}
fn default_modulus_bits() -> u32 {
    61
}
fn default_permutations() -> Vec<u64> {
    DEFAULT_PERMUTATIONS.to_vec()
}
fn default_source_base() -> u64 {
    31
}
fn default_source_modulus_bits() -> u32 {
    31
}
fn default_store_backend() -> String {
    "redb".to_string()
}
fn default_store_path() -> String {
    "data/newsdedup".to_string()
}
fn default_compression() -> String {
    "zstd".to_string()
}
fn default_compression_level() -> i32 {
    3
}
fn default_batch_size() -> usize {
    100
}
fn default_poll_interval_secs() -> u64 {
    30
}
fn default_log_every() -> u64 {
    100
}
