//! Checksum configuration types.

use std::path::Path;
use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::algorithm::ChecksumAlgorithm;
use crate::error::ChecksumError;
use crate::matcher::IgnoreList;

/// Default number of worker threads.
pub const DEFAULT_WORKERS: usize = 30;

/// Default global wait ceiling, one day.
pub const DEFAULT_WAIT_CEILING_SECS: u64 = 24 * 60 * 60;

/// Configuration for a checksum computation.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
#[serde(default, deny_unknown_fields)]
pub struct ChecksumConfig {
    /// Digest algorithm.
    #[builder(default)]
    pub algorithm: ChecksumAlgorithm,

    /// Glob patterns of paths to skip.
    #[builder(default)]
    pub ignore: Vec<String>,

    /// Size of the worker pool.
    #[builder(default = "DEFAULT_WORKERS")]
    pub workers: usize,

    /// Maximum wall-clock time of a computation, in seconds.
    #[builder(default = "DEFAULT_WAIT_CEILING_SECS")]
    pub wait_ceiling_secs: u64,

    /// Follow symbolic links on local storage.
    #[builder(default = "false")]
    pub follow_symlinks: bool,
}

impl ChecksumConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.workers == Some(0) {
            return Err("Worker count must be at least 1".to_string());
        }
        if self.wait_ceiling_secs == Some(0) {
            return Err("Wait ceiling must be at least 1 second".to_string());
        }
        Ok(())
    }
}

impl ChecksumConfig {
    /// Create a new config builder.
    pub fn builder() -> ChecksumConfigBuilder {
        ChecksumConfigBuilder::default()
    }

    /// Parse a TOML document. Missing keys take their default value.
    pub fn from_toml_str(content: &str) -> Result<Self, ChecksumError> {
        let config: Self = toml::from_str(content).map_err(|e| ChecksumError::InvalidConfig {
            message: e.to_string(),
        })?;
        config.check()?;
        Ok(config)
    }

    /// Read a TOML configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ChecksumError> {
        let content = std::fs::read_to_string(path).map_err(|e| ChecksumError::InvalidConfig {
            message: format!("unable to read {}: {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Compile the ignore patterns.
    pub fn ignore_list(&self) -> Result<IgnoreList, ChecksumError> {
        IgnoreList::from_patterns(&self.ignore)
    }

    /// Wait ceiling as a duration.
    pub fn wait_ceiling(&self) -> Duration {
        Duration::from_secs(self.wait_ceiling_secs)
    }

    fn check(&self) -> Result<(), ChecksumError> {
        let builder = ChecksumConfigBuilder {
            workers: Some(self.workers),
            wait_ceiling_secs: Some(self.wait_ceiling_secs),
            ..Default::default()
        };
        builder
            .validate()
            .map_err(|message| ChecksumError::InvalidConfig { message })
    }
}

impl Default for ChecksumConfig {
    fn default() -> Self {
        Self {
            algorithm: ChecksumAlgorithm::default(),
            ignore: Vec::new(),
            workers: DEFAULT_WORKERS,
            wait_ceiling_secs: DEFAULT_WAIT_CEILING_SECS,
            follow_symlinks: false,
        }
    }
}
