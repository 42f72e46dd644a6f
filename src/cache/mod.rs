//! Cache Module
//!
//! Provides the two in-process caches: a capacity-bounded LRU cache and a
//! concurrent TTL cache. They are independent; neither uses the other.

mod entry;
mod lru;
mod stats;
mod ttl;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::TtlEntry;
pub use lru::{Iter as LruIter, LruCache};
pub use stats::{LruStats, TtlStats};
pub use ttl::TtlCache;
