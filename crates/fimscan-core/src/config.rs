//! Scan configuration types.

use std::path::{Path, PathBuf};

use derive_builder::Builder;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::error::ScanError;
use crate::hash::HashType;
use crate::size::{serde_size, serde_size_opt};

/// Default upper bound on bytes read when hashing a file (100 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Configuration for scanning operations.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Root paths to scan, in order.
    pub paths: Vec<PathBuf>,

    /// Descend into subdirectories of each root.
    #[builder(default = "false")]
    #[serde(default)]
    pub recursive: bool,

    /// Files larger than this are reported but not hashed. Also the
    /// capacity of the throttle's token bucket.
    #[builder(default = "DEFAULT_MAX_FILE_SIZE")]
    #[serde(default = "default_max_file_size", with = "serde_size")]
    pub max_file_size: u64,

    /// Algorithms computed for every hashed file.
    #[builder(default = "default_hash_types()")]
    #[serde(default = "default_hash_types")]
    pub hash_types: Vec<HashType>,

    /// Hashing I/O budget. `None` or zero disables throttling.
    #[builder(default)]
    #[serde(default, with = "serde_size_opt")]
    pub scan_rate_bytes_per_sec: Option<u64>,

    /// Glob patterns matched against full paths.
    #[builder(default)]
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

fn default_hash_types() -> Vec<HashType> {
    vec![HashType::Blake3]
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref paths) = self.paths {
            if paths.iter().any(|p| p.as_os_str().is_empty()) {
                return Err("Root paths cannot be empty".to_string());
            }
        } else {
            return Err("Root paths are required".to_string());
        }
        Ok(())
    }
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Create a simple config scanning the given roots.
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            recursive: false,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            hash_types: default_hash_types(),
            scan_rate_bytes_per_sec: None,
            exclude_patterns: Vec::new(),
        }
    }

    /// Effective throttle rate in bytes per second, if throttling is on.
    pub fn throttle_rate(&self) -> Option<u64> {
        self.scan_rate_bytes_per_sec.filter(|&rate| rate > 0)
    }

    /// Compile the exclude patterns.
    pub fn exclude_matcher(&self) -> Result<ExcludeMatcher, ScanError> {
        ExcludeMatcher::new(&self.exclude_patterns)
    }

    /// Check the settings a scan cannot start without.
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.throttle_rate().is_some() && self.max_file_size == 0 {
            return Err(ScanError::invalid_config(
                "max_file_size must be positive when scan_rate_bytes_per_sec is set",
            ));
        }
        self.exclude_matcher()?;
        Ok(())
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new(Vec::<PathBuf>::new())
    }
}

/// Compiled exclusion predicate over paths.
#[derive(Debug, Clone)]
pub struct ExcludeMatcher {
    set: GlobSet,
}

impl ExcludeMatcher {
    /// Compile a set of glob patterns.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ScanError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let glob = Glob::new(pattern).map_err(|source| ScanError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|source| ScanError::InvalidPattern {
            pattern: patterns
                .iter()
                .map(|p| p.as_ref())
                .collect::<Vec<_>>()
                .join(", "),
            source,
        })?;
        Ok(Self { set })
    }

    /// A matcher that excludes nothing.
    pub fn empty() -> Self {
        Self {
            set: GlobSet::empty(),
        }
    }

    /// Check if a path is excluded.
    pub fn is_match(&self, path: &Path) -> bool {
        self.set.is_match(path)
    }
}

impl Default for ExcludeMatcher {
    fn default() -> Self {
        Self::empty()
    }
}
