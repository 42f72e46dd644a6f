//! Configuration Module
//!
//! Construction parameters for the TTL cache. Values are fixed once a cache
//! is built; there is no runtime reconfiguration.

use std::time::Duration;

use crate::error::{CacheError, Result};

/// Default time-to-live applied by `TtlCache::put` (5 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Default interval between background sweeps (60 seconds)
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Default bound on how long shutdown waits for the reaper (5 seconds)
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// TTL cache configuration parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlConfig {
    /// TTL for entries stored without an explicit TTL
    pub default_ttl: Duration,
    /// Whether a background reaper sweeps expired entries
    pub auto_cleanup: bool,
    /// Interval between background sweeps
    pub cleanup_interval: Duration,
    /// How long shutdown waits for the reaper before aborting it
    pub shutdown_timeout: Duration,
}

impl TtlConfig {
    /// Creates a configuration from the three construction options.
    ///
    /// # Arguments
    /// * `default_ttl` - TTL for entries stored without an explicit TTL
    /// * `auto_cleanup` - Whether to run the background reaper
    /// * `cleanup_interval` - Time between background sweeps
    pub fn new(default_ttl: Duration, auto_cleanup: bool, cleanup_interval: Duration) -> Self {
        Self {
            default_ttl,
            auto_cleanup,
            cleanup_interval,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Creates a configuration with the given default TTL and the default
    /// cleanup settings (enabled, every 60 seconds).
    pub fn with_default_ttl(default_ttl: Duration) -> Self {
        Self::new(default_ttl, true, DEFAULT_CLEANUP_INTERVAL)
    }

    /// Overrides the shutdown wait bound.
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Checks that the configuration can drive a cache.
    ///
    /// A zero cleanup interval is only meaningful when no reaper runs.
    pub fn validate(&self) -> Result<()> {
        if self.auto_cleanup && self.cleanup_interval.is_zero() {
            return Err(CacheError::InvalidConfig(
                "cleanup interval must be positive when auto cleanup is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self::with_default_ttl(DEFAULT_TTL)
    }
}
