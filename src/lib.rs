//! Expiring Cache - in-process caching components
//!
//! Provides a capacity-bounded LRU cache with O(1) operations and a
//! thread-safe TTL cache with lazy expiry and a background reaper.

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{LruCache, LruStats, TtlCache, TtlStats};
pub use config::TtlConfig;
pub use error::{CacheError, Result};
