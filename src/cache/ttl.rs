//! TTL Cache Module
//!
//! Concurrent key/value store where every entry expires a fixed duration
//! after it was stored.
//!
//! Expired entries are never returned. They are reclaimed lazily when a
//! lookup touches them, eagerly by `cleanup` or the background reaper, or
//! explicitly through `remove`/`clear`. Entries live in a sharded
//! `DashMap`, so single-key operations on different keys do not block each
//! other and no caller-side locking is needed.

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::DashMap;
use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::cache::{TtlEntry, TtlStats};
use crate::config::TtlConfig;
use crate::error::{CacheError, Result};
use crate::tasks::{spawn_cleanup_task, Reaper, Sweep};

// == TTL Store ==
/// Entries plus counters, shared between the cache and its reaper.
struct TtlStore<K, V> {
    entries: DashMap<K, TtlEntry<V>>,
    hits: AtomicU64,
    misses: AtomicU64,
    expired_removals: AtomicU64,
}

impl<K, V> TtlStore<K, V>
where
    K: Eq + Hash + Clone,
{
    fn new() -> Self {
        Self {
            entries: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expired_removals: AtomicU64::new(0),
        }
    }

    /// Removes `key` only if the entry currently stored is expired at `now`.
    ///
    /// A concurrent `put` that replaced the entry with a fresh one makes
    /// this a no-op.
    fn remove_expired<Q>(&self, key: &Q, now: Instant) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let removed = self
            .entries
            .remove_if(key, |_, entry| entry.is_expired_at(now))
            .is_some();
        if removed {
            self.expired_removals.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Removes every entry expired at the time of the call.
    ///
    /// Expired keys are collected first and then removed one at a time, so
    /// no shard stays write-locked for longer than a single removal.
    fn cleanup(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<K> = self
            .entries
            .iter()
            .filter(|entry| entry.value().is_expired_at(now))
            .map(|entry| entry.key().clone())
            .collect();

        expired
            .iter()
            .filter(|key| self.remove_expired(*key, now))
            .count()
    }
}

impl<K, V> Sweep for TtlStore<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Send + Sync,
{
    fn sweep(&self) -> usize {
        self.cleanup()
    }
}

// == TTL Cache ==
/// Thread-safe cache with per-entry expiration and an optional background
/// reaper.
///
/// The reaper is a Tokio task, so a cache with `auto_cleanup` enabled must
/// be built inside a Tokio runtime. Call [`TtlCache::shutdown`] to stop it;
/// dropping the cache also ends the task, but without waiting for it.
pub struct TtlCache<K, V> {
    store: Arc<TtlStore<K, V>>,
    config: TtlConfig,
    reaper: Mutex<Option<Reaper>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Constructors ==
    /// Creates a cache with a 5 minute default TTL and a sweep every 60
    /// seconds.
    ///
    /// # Errors
    /// Returns `CacheError::RuntimeUnavailable` outside a Tokio runtime.
    pub fn new() -> Result<Self> {
        Self::with_config(TtlConfig::default())
    }

    /// Creates a cache with the given default TTL and a sweep every 60
    /// seconds.
    ///
    /// # Arguments
    /// * `default_ttl` - TTL applied by `put`
    ///
    /// # Errors
    /// Returns `CacheError::RuntimeUnavailable` outside a Tokio runtime.
    pub fn with_default_ttl(default_ttl: Duration) -> Result<Self> {
        Self::with_config(TtlConfig::with_default_ttl(default_ttl))
    }

    /// Creates a cache from a full configuration.
    ///
    /// # Arguments
    /// * `config` - Default TTL, cleanup settings and shutdown bound
    ///
    /// # Errors
    /// - `CacheError::InvalidConfig` if the configuration does not validate
    /// - `CacheError::RuntimeUnavailable` if `auto_cleanup` is set and no
    ///   Tokio runtime is running on this thread
    pub fn with_config(config: TtlConfig) -> Result<Self> {
        config.validate()?;

        let store = Arc::new(TtlStore::new());
        let reaper = if config.auto_cleanup {
            let runtime = Handle::try_current()
                .map_err(|e| CacheError::RuntimeUnavailable(e.to_string()))?;
            let target: Arc<dyn Sweep> = store.clone();
            Some(spawn_cleanup_task(&runtime, target, config.cleanup_interval))
        } else {
            None
        };

        Ok(Self {
            store,
            config,
            reaper: Mutex::new(reaper),
        })
    }

    // == Put ==
    /// Stores `value` under `key` with the default TTL, replacing any
    /// previous entry.
    pub fn put(&self, key: K, value: V) {
        self.put_with_ttl(key, value, self.config.default_ttl);
    }

    /// Stores `value` under `key`, expiring `ttl` from now.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - The value to store
    /// * `ttl` - Lifetime of the entry; zero stores an already expired entry
    pub fn put_with_ttl(&self, key: K, value: V, ttl: Duration) {
        self.store.entries.insert(key, TtlEntry::new(value, ttl));
    }

    // == Get ==
    /// Returns the value for `key` if it has not expired.
    ///
    /// An expired entry is removed on the way out.
    ///
    /// # Returns
    /// - `Some(value)` if the entry exists and is live
    /// - `None` if the key is absent or expired
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.read_live(key, |entry, _| entry.value.clone())
    }

    /// Returns the value for `key` together with its remaining TTL.
    pub fn get_with_ttl<Q>(&self, key: &Q) -> Option<(V, Duration)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.read_live(key, |entry, now| {
            (entry.value.clone(), entry.remaining_at(now))
        })
    }

    /// Checks if `key` holds an unexpired entry.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.read_live(key, |_, _| ()).is_some()
    }

    // == Remove ==
    /// Removes `key` whatever its state.
    ///
    /// # Returns
    /// - `Some(value)` if the removed entry had not expired
    /// - `None` if the key was absent or already expired
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let (_, entry) = self.store.entries.remove(key)?;
        if entry.is_expired() {
            self.store.expired_removals.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        Some(entry.value)
    }

    // == TTL Queries ==
    /// Returns the remaining lifetime of `key`, or `None` if it is absent
    /// or expired.
    pub fn remaining_ttl<Q>(&self, key: &Q) -> Option<Duration>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.read_live(key, |entry, now| entry.remaining_at(now))
    }

    /// Adds `additional` to the expiration of a live entry.
    ///
    /// The extension counts from the entry's current expiration, not from
    /// now, so repeated calls accumulate.
    ///
    /// # Arguments
    /// * `key` - The key to extend
    /// * `additional` - Time added to the current expiration
    ///
    /// # Returns
    /// - `true` if the entry was live and has been extended
    /// - `false` if the key is absent or expired
    pub fn extend_ttl<Q>(&self, key: &Q, additional: Duration) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = Instant::now();
        {
            let Some(mut entry) = self.store.entries.get_mut(key) else {
                return false;
            };
            if !entry.is_expired_at(now) {
                entry.extend(additional);
                return true;
            }
        }
        self.store.remove_expired(key, now);
        false
    }

    // == Cleanup ==
    /// Removes every expired entry now, returning how many were removed.
    ///
    /// Safe to call while other threads read and write the cache.
    pub fn cleanup(&self) -> usize {
        self.store.cleanup()
    }

    // == Sizes ==
    /// Returns the number of stored entries, including expired entries not
    /// yet reclaimed.
    pub fn size(&self) -> usize {
        self.store.entries.len()
    }

    /// Runs a cleanup and returns the number of remaining entries. O(n).
    pub fn valid_size(&self) -> usize {
        self.cleanup();
        self.size()
    }

    /// Runs a cleanup and reports whether any entry remains.
    pub fn is_empty(&self) -> bool {
        self.cleanup();
        self.store.entries.is_empty()
    }

    // == Clear ==
    /// Removes every entry, live or expired. Counters are kept.
    pub fn clear(&self) {
        self.store.entries.clear();
    }

    // == Stats ==
    /// Returns a snapshot of sizes, configuration and counters.
    pub fn stats(&self) -> TtlStats {
        let now = Instant::now();
        let total_size = self.store.entries.len();
        let expired_size = self
            .store
            .entries
            .iter()
            .filter(|entry| entry.value().is_expired_at(now))
            .count();

        TtlStats {
            total_size,
            valid_size: total_size.saturating_sub(expired_size),
            expired_size,
            default_ttl: self.config.default_ttl,
            auto_cleanup: self.config.auto_cleanup,
            cleanup_interval: self.config.cleanup_interval,
            hits: self.store.hits.load(Ordering::Relaxed),
            misses: self.store.misses.load(Ordering::Relaxed),
            expired_removals: self.store.expired_removals.load(Ordering::Relaxed),
            captured_at: Utc::now(),
        }
    }

    /// Returns the configuration the cache was built with.
    pub fn config(&self) -> &TtlConfig {
        &self.config
    }

    /// Returns true while the cache still owns a background reaper,
    /// including while a shutdown is stopping it.
    pub fn has_reaper(&self) -> bool {
        self.reaper
            .try_lock()
            .map_or(true, |reaper| reaper.is_some())
    }

    // == Shutdown ==
    /// Stops the reaper and clears the store.
    ///
    /// Waits up to `shutdown_timeout` for a sweep in progress to finish,
    /// then aborts the task. Concurrent callers all wait until the reaper
    /// is gone; a later call is a no-op apart from clearing the store. The
    /// cache stays usable afterwards as a plain empty cache with no
    /// background cleanup.
    pub async fn shutdown(&self) {
        // Held across the stop so concurrent callers queue behind it
        let mut reaper = self.reaper.lock().await;
        if let Some(running) = reaper.take() {
            running.stop(self.config.shutdown_timeout).await;
        }
        drop(reaper);

        self.store.entries.clear();
        debug!("TTL cache shut down");
    }

    // == Helpers ==
    /// Looks up a live entry and counts the lookup as a hit or a miss.
    fn read_live<Q, R>(
        &self,
        key: &Q,
        read: impl FnOnce(&TtlEntry<V>, Instant) -> R,
    ) -> Option<R>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let found = self.lookup_live(key, read);
        let counter = if found.is_some() {
            &self.store.hits
        } else {
            &self.store.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Runs `read` on the entry for `key` if it is live; reclaims it if it
    /// has expired.
    fn lookup_live<Q, R>(
        &self,
        key: &Q,
        read: impl FnOnce(&TtlEntry<V>, Instant) -> R,
    ) -> Option<R>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = Instant::now();
        {
            let entry = self.store.entries.get(key)?;
            if !entry.is_expired_at(now) {
                return Some(read(entry.value(), now));
            }
        }

        if self.store.remove_expired(key, now) {
            trace!("TTL entry expired on access");
        }
        None
    }
}

impl<K, V> fmt::Display for TtlCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static + fmt::Display,
    V: Clone + Send + Sync + 'static + fmt::Display,
{
    /// Sweeps expired entries, then renders the live ones with their
    /// remaining TTL: `TtlCache(default_ttl=300000ms, size=1): {k=v(ttl=2999ms)}`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.cleanup();

        let now = Instant::now();
        let live: Vec<String> = self
            .store
            .entries
            .iter()
            .filter(|entry| !entry.value().is_expired_at(now))
            .map(|entry| {
                format!(
                    "{}={}(ttl={}ms)",
                    entry.key(),
                    entry.value().value,
                    entry.value().remaining_at(now).as_millis()
                )
            })
            .collect();

        write!(
            f,
            "TtlCache(default_ttl={}ms, size={}): {{{}}}",
            self.config.default_ttl.as_millis(),
            live.len(),
            live.join(", ")
        )
    }
}

impl<K, V> fmt::Debug for TtlCache<K, V>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlCache")
            .field("config", &self.config)
            .field("size", &self.store.entries.len())
            .finish()
    }
}
