//! LRU Cache Module
//!
//! Capacity-bounded key/value store that evicts the least recently used
//! entry when full.
//!
//! Recency is kept in a doubly linked list threaded through an arena of
//! nodes. Links are arena indices, and two sentinel nodes mark the head
//! (most recently used side) and the tail (least recently used side), so
//! move-to-front and evict-from-tail never scan. A hash map from key to
//! node index gives O(1) lookup.
//!
//! # Concurrency
//! `LruCache` is a plain synchronous structure and is not designed for
//! concurrent access. Every operation takes `&mut self`, including `get`,
//! because a read reorders recency. Callers sharing a cache across threads
//! must serialize every call themselves, e.g. behind a `Mutex`.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use tracing::trace;

use crate::cache::LruStats;
use crate::error::{CacheError, Result};

/// Arena index of the head sentinel (MRU side)
const HEAD: usize = 0;
/// Arena index of the tail sentinel (LRU side)
const TAIL: usize = 1;

// == Node ==
/// Arena slot. Sentinels and freed slots carry no entry.
#[derive(Debug)]
struct Node<K, V> {
    entry: Option<(K, V)>,
    prev: usize,
    next: usize,
}

impl<K, V> Node<K, V> {
    fn sentinel(prev: usize, next: usize) -> Self {
        Self {
            entry: None,
            prev,
            next,
        }
    }
}

// == LRU Cache ==
/// Fixed-capacity cache with least-recently-used eviction.
///
/// All operations are O(1).
pub struct LruCache<K, V> {
    /// Node arena; slots 0 and 1 are the head and tail sentinels
    nodes: Vec<Node<K, V>>,
    /// Recycled arena slots
    free: Vec<usize>,
    /// Key to arena index
    index: HashMap<K, usize>,
    /// Maximum number of entries
    capacity: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    // == Constructor ==
    /// Creates an empty cache holding at most `capacity` entries.
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of entries, must be positive
    ///
    /// # Errors
    /// Returns `CacheError::InvalidConfig` when `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(CacheError::InvalidConfig(
                "LRU capacity must be positive".to_string(),
            ));
        }

        let mut nodes = Vec::with_capacity(capacity + 2);
        nodes.push(Node::sentinel(HEAD, TAIL));
        nodes.push(Node::sentinel(HEAD, TAIL));

        Ok(Self {
            nodes,
            free: Vec::new(),
            index: HashMap::with_capacity(capacity),
            capacity,
            hits: 0,
            misses: 0,
            evictions: 0,
        })
    }

    // == Get ==
    /// Returns the value for `key` and marks it most recently used.
    ///
    /// A miss has no side effect beyond the miss counter.
    ///
    /// # Returns
    /// - `Some(&value)` if the key is present
    /// - `None` if the key is absent
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(&idx) = self.index.get(key) else {
            self.misses += 1;
            return None;
        };

        self.hits += 1;
        self.move_to_front(idx);
        self.nodes[idx].entry.as_ref().map(|(_, value)| value)
    }

    // == Put ==
    /// Inserts or updates `key`, making it most recently used.
    ///
    /// Inserting a new key into a full cache first evicts the least
    /// recently used entry.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - The value to store, replacing any previous one
    pub fn put(&mut self, key: K, value: V) {
        if let Some(&idx) = self.index.get(&key) {
            if let Some((_, slot)) = self.nodes[idx].entry.as_mut() {
                *slot = value;
            }
            self.move_to_front(idx);
            return;
        }

        if self.index.len() >= self.capacity {
            self.evict_lru();
        }

        let idx = self.alloc(key.clone(), value);
        self.link_front(idx);
        self.index.insert(key, idx);
    }

    // == Remove ==
    /// Removes `key`, returning its value if it was present.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.index.remove(key)?;
        self.unlink(idx);
        self.release(idx).map(|(_, value)| value)
    }

    // == Contains ==
    /// Checks if `key` is present without touching its recency.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.contains_key(key)
    }

    // == Clear ==
    /// Removes every entry. Counters are kept.
    pub fn clear(&mut self) {
        self.index.clear();
        self.nodes.truncate(2);
        self.nodes[HEAD].next = TAIL;
        self.nodes[TAIL].prev = HEAD;
        self.free.clear();
    }

    /// Returns the number of entries.
    pub fn size(&self) -> usize {
        self.index.len()
    }

    /// Returns the maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    // == Iter ==
    /// Iterates entries from most to least recently used without touching
    /// recency.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            nodes: &self.nodes,
            cursor: self.nodes[HEAD].next,
        }
    }

    // == Stats ==
    /// Returns a snapshot of the cache counters.
    pub fn stats(&self) -> LruStats {
        LruStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            size: self.size(),
            capacity: self.capacity,
        }
    }

    // == List Maintenance ==
    fn evict_lru(&mut self) {
        let idx = self.nodes[TAIL].prev;
        if idx == HEAD {
            return;
        }

        self.unlink(idx);
        if let Some((key, _)) = self.release(idx) {
            self.index.remove(&key);
            self.evictions += 1;
            trace!(slot = idx, "LRU eviction");
        }
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.nodes[HEAD].next == idx {
            return;
        }
        self.unlink(idx);
        self.link_front(idx);
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.nodes[idx].prev, self.nodes[idx].next);
        self.nodes[prev].next = next;
        self.nodes[next].prev = prev;
    }

    fn link_front(&mut self, idx: usize) {
        let first = self.nodes[HEAD].next;
        self.nodes[idx].prev = HEAD;
        self.nodes[idx].next = first;
        self.nodes[first].prev = idx;
        self.nodes[HEAD].next = idx;
    }

    fn alloc(&mut self, key: K, value: V) -> usize {
        match self.free.pop() {
            Some(idx) => {
                self.nodes[idx].entry = Some((key, value));
                idx
            }
            None => {
                self.nodes.push(Node {
                    entry: Some((key, value)),
                    prev: HEAD,
                    next: TAIL,
                });
                self.nodes.len() - 1
            }
        }
    }

    /// Takes the entry out of an unlinked slot and recycles the slot.
    fn release(&mut self, idx: usize) -> Option<(K, V)> {
        let entry = self.nodes[idx].entry.take();
        self.free.push(idx);
        entry
    }
}

// == Iterator ==
/// Iterator over `(key, value)` pairs from MRU to LRU.
pub struct Iter<'a, K, V> {
    nodes: &'a [Node<K, V>],
    cursor: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == TAIL {
            return None;
        }
        let node = &self.nodes[self.cursor];
        self.cursor = node.next;
        node.entry.as_ref().map(|(key, value)| (key, value))
    }
}

impl<K, V> fmt::Display for LruCache<K, V>
where
    K: Hash + Eq + Clone + fmt::Display,
    V: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LruCache(capacity={}, size={}): [",
            self.capacity,
            self.size()
        )?;
        for (i, (key, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        write!(f, "]")
    }
}

impl<K, V> fmt::Debug for LruCache<K, V>
where
    K: Hash + Eq + Clone + fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("capacity", &self.capacity)
            .field("entries", &self.iter().collect::<Vec<_>>())
            .finish()
    }
}
