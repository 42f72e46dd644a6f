//! Cache Statistics Module
//!
//! Point-in-time snapshots of cache counters and sizes.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

// == LRU Stats ==
/// Snapshot of an `LruCache`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LruStats {
    /// Number of successful lookups
    pub hits: u64,
    /// Number of lookups for absent keys
    pub misses: u64,
    /// Number of entries evicted to make room
    pub evictions: u64,
    /// Current number of entries
    pub size: usize,
    /// Maximum number of entries
    pub capacity: usize,
}

impl LruStats {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        hit_rate(self.hits, self.misses)
    }
}

// == TTL Stats ==
/// Snapshot of a `TtlCache`.
///
/// The counts come from separate passes over a live store, so an entry can
/// expire between them; the snapshot is not atomic across the structure.
#[derive(Debug, Clone, Serialize)]
pub struct TtlStats {
    /// Physically stored entries, expired or not
    pub total_size: usize,
    /// Entries still valid when observed
    pub valid_size: usize,
    /// Entries expired but not yet reclaimed
    pub expired_size: usize,
    #[serde(serialize_with = "as_millis")]
    pub default_ttl: Duration,
    pub auto_cleanup: bool,
    #[serde(serialize_with = "as_millis")]
    pub cleanup_interval: Duration,
    /// Keyed lookups that found a live entry (`get`, `get_with_ttl`,
    /// `contains_key`, `remaining_ttl`)
    pub hits: u64,
    /// Keyed lookups for absent or expired keys
    pub misses: u64,
    /// Expired entries reclaimed lazily or by a sweep
    pub expired_removals: u64,
    /// When the snapshot was taken
    pub captured_at: DateTime<Utc>,
}

impl TtlStats {
    pub fn hit_rate(&self) -> f64 {
        hit_rate(self.hits, self.misses)
    }
}

fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}
