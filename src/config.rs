//! Store and sweeper configuration.

use std::time::Duration;
use thiserror::Error;

/// Default number of shards.
/// More shards = less lock contention, but more memory overhead.
pub const DEFAULT_NUM_SHARDS: usize = 256;

/// Default width of one expiry bucket.
pub const DEFAULT_BUCKET_INTERVAL: Duration = Duration::from_secs(5);

/// Errors raised while validating a configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The store needs at least one shard
    #[error("shard count must be at least 1")]
    ZeroShards,

    /// Expiry buckets need a positive width
    #[error("bucket interval must be greater than zero")]
    ZeroBucketInterval,

    /// Sweeper intervals must satisfy min <= base <= max
    #[error("invalid sweeper intervals: min {min:?}, base {base:?}, max {max:?}")]
    InvalidSweepIntervals {
        min: Duration,
        base: Duration,
        max: Duration,
    },
}

/// Configuration for a [`ShardedStore`](crate::storage::ShardedStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Number of independently locked shards (default: 256)
    pub num_shards: usize,

    /// Width of one expiry bucket (default: 5s).
    ///
    /// Expired items are swept at most one interval after their deadline.
    pub bucket_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            num_shards: DEFAULT_NUM_SHARDS,
            bucket_interval: DEFAULT_BUCKET_INTERVAL,
        }
    }
}

impl StoreConfig {
    /// Checks that the configuration can build a working store.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_shards == 0 {
            return Err(ConfigError::ZeroShards);
        }
        if self.bucket_interval.is_zero() {
            return Err(ConfigError::ZeroBucketInterval);
        }
        Ok(())
    }
}

/// Configuration for the [`ExpirySweeper`](crate::sweeper::ExpirySweeper).
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Base interval between sweeps (default: 1s)
    pub base_interval: Duration,

    /// Minimum interval between sweeps (default: 100ms)
    pub min_interval: Duration,

    /// Maximum interval between sweeps (default: 5s)
    pub max_interval: Duration,

    /// If this fraction of stored keys was evicted, speed up sweeping
    pub speedup_threshold: f64,

    /// If this fraction of stored keys was evicted, slow down sweeping
    pub slowdown_threshold: f64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_secs(1),
            min_interval: Duration::from_millis(100),
            max_interval: DEFAULT_BUCKET_INTERVAL,
            speedup_threshold: 0.25,
            slowdown_threshold: 0.01,
        }
    }
}

impl SweeperConfig {
    /// Checks that `min_interval <= base_interval <= max_interval` and none is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ordered = self.min_interval <= self.base_interval
            && self.base_interval <= self.max_interval;
        if self.min_interval.is_zero() || !ordered {
            return Err(ConfigError::InvalidSweepIntervals {
                min: self.min_interval,
                base: self.base_interval,
                max: self.max_interval,
            });
        }
        Ok(())
    }
}
