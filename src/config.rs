//! Configuration for hashstore
//!
//! Centralized configuration with sensible defaults.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::HashStoreError;

/// Main configuration for a block store instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory that file names are resolved against
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Buffer Pool Configuration
    // -------------------------------------------------------------------------
    /// Number of block frames kept in memory
    pub buffer_capacity: usize,

    /// Max files open at the same time
    pub max_open_files: usize,

    /// Which unpinned frame gets evicted when the pool is full
    pub replacement_policy: ReplacementPolicy,

    // -------------------------------------------------------------------------
    // Hash File Configuration
    // -------------------------------------------------------------------------
    /// Bucket count used by drivers when none is given
    pub default_buckets: u32,
}

/// Buffer replacement policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplacementPolicy {
    /// Evict the least recently used unpinned frame
    #[default]
    Lru,

    /// Evict the most recently used unpinned frame
    Mru,
}

impl fmt::Display for ReplacementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplacementPolicy::Lru => f.write_str("lru"),
            ReplacementPolicy::Mru => f.write_str("mru"),
        }
    }
}

impl FromStr for ReplacementPolicy {
    type Err = HashStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lru" => Ok(ReplacementPolicy::Lru),
            "mru" => Ok(ReplacementPolicy::Mru),
            other => Err(HashStoreError::Config(format!(
                "unknown replacement policy: {}",
                other
            ))),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            buffer_capacity: 100,
            max_open_files: 100,
            replacement_policy: ReplacementPolicy::Lru,
            default_buckets: 10,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the values a block store cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.buffer_capacity == 0 {
            return Err(HashStoreError::Config(
                "buffer_capacity must be at least 1".to_string(),
            ));
        }
        if self.max_open_files == 0 {
            return Err(HashStoreError::Config(
                "max_open_files must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the number of frames in the buffer pool
    pub fn buffer_capacity(mut self, frames: usize) -> Self {
        self.config.buffer_capacity = frames;
        self
    }

    /// Set the maximum number of open files
    pub fn max_open_files(mut self, count: usize) -> Self {
        self.config.max_open_files = count;
        self
    }

    /// Set the buffer replacement policy
    pub fn replacement_policy(mut self, policy: ReplacementPolicy) -> Self {
        self.config.replacement_policy = policy;
        self
    }

    /// Set the default bucket count for new files
    pub fn default_buckets(mut self, buckets: u32) -> Self {
        self.config.default_buckets = buckets;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_parse() {
        assert_eq!("LRU".parse::<ReplacementPolicy>().unwrap(), ReplacementPolicy::Lru);
        assert_eq!("mru".parse::<ReplacementPolicy>().unwrap(), ReplacementPolicy::Mru);
        assert!("fifo".parse::<ReplacementPolicy>().is_err());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = Config::builder().buffer_capacity(0).build();
        assert!(matches!(config.validate(), Err(HashStoreError::Config(_))));
    }
}
