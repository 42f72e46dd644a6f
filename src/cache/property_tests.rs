//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the LRU ordering invariants against a reference
//! model and the TTL cleanup invariants.

use proptest::prelude::*;
use std::collections::{HashSet, VecDeque};
use std::thread::sleep;
use std::time::Duration;

use crate::cache::{LruCache, TtlCache};
use crate::config::TtlConfig;

// == Strategies ==
/// Small key space so sequences revisit keys often
fn small_key_strategy() -> impl Strategy<Value = u8> {
    0u8..16
}

fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,32}".prop_map(|s| s)
}

/// Generates a sequence of cache operations for testing
#[derive(Debug, Clone)]
enum CacheOp {
    Put { key: u8, value: u32 },
    Get { key: u8 },
    Remove { key: u8 },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (small_key_strategy(), any::<u32>()).prop_map(|(key, value)| CacheOp::Put { key, value }),
        small_key_strategy().prop_map(|key| CacheOp::Get { key }),
        small_key_strategy().prop_map(|key| CacheOp::Remove { key }),
    ]
}

// == Reference Model ==
/// Naive LRU: a deque ordered MRU first, scanned linearly.
struct ModelLru {
    capacity: usize,
    order: VecDeque<(u8, u32)>,
}

impl ModelLru {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::new(),
        }
    }

    fn take(&mut self, key: u8) -> Option<(u8, u32)> {
        let pos = self.order.iter().position(|(k, _)| *k == key)?;
        self.order.remove(pos)
    }

    fn get(&mut self, key: u8) -> Option<u32> {
        let entry = self.take(key)?;
        self.order.push_front(entry);
        Some(entry.1)
    }

    fn put(&mut self, key: u8, value: u32) {
        if self.take(key).is_none() && self.order.len() >= self.capacity {
            self.order.pop_back();
        }
        self.order.push_front((key, value));
    }

    fn remove(&mut self, key: u8) -> Option<u32> {
        self.take(key).map(|(_, v)| v)
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // For any sequence of puts, size never exceeds capacity.
    #[test]
    fn prop_capacity_enforcement(
        capacity in 1usize..8,
        keys in prop::collection::vec(small_key_strategy(), 1..200)
    ) {
        let mut cache = LruCache::new(capacity).unwrap();

        for key in keys {
            cache.put(key, ());
            prop_assert!(
                cache.size() <= cache.capacity(),
                "Cache size {} exceeds capacity {}",
                cache.size(),
                cache.capacity()
            );
        }
    }

    // For any sequence of operations, results and the MRU-to-LRU order match
    // the naive model after every step.
    #[test]
    fn prop_matches_reference_model(
        capacity in 1usize..6,
        ops in prop::collection::vec(cache_op_strategy(), 1..120)
    ) {
        let mut cache = LruCache::new(capacity).unwrap();
        let mut model = ModelLru::new(capacity);

        for op in ops {
            match op {
                CacheOp::Put { key, value } => {
                    cache.put(key, value);
                    model.put(key, value);
                }
                CacheOp::Get { key } => {
                    prop_assert_eq!(cache.get(&key).copied(), model.get(key));
                }
                CacheOp::Remove { key } => {
                    prop_assert_eq!(cache.remove(&key), model.remove(key));
                }
            }

            let actual: Vec<(u8, u32)> = cache.iter().map(|(k, v)| (*k, *v)).collect();
            let expected: Vec<(u8, u32)> = model.order.iter().copied().collect();
            prop_assert_eq!(actual, expected);
            prop_assert_eq!(cache.size(), model.order.len());
        }
    }

    // When a full cache takes a new key, the entry accessed least recently
    // is the one evicted.
    #[test]
    fn prop_lru_eviction_order(
        initial_keys in prop::collection::vec(valid_key_strategy(), 3..10),
        new_key in valid_key_strategy()
    ) {
        let mut seen = HashSet::new();
        let unique_keys: Vec<String> = initial_keys
            .into_iter()
            .filter(|k| seen.insert(k.clone()))
            .collect();

        prop_assume!(unique_keys.len() >= 2);
        prop_assume!(!unique_keys.contains(&new_key));

        let capacity = unique_keys.len();
        let mut cache = LruCache::new(capacity).unwrap();

        for key in &unique_keys {
            cache.put(key.clone(), format!("value_{}", key));
        }
        cache.put(new_key.clone(), "new".to_string());

        prop_assert_eq!(cache.size(), capacity);
        prop_assert!(
            !cache.contains_key(&unique_keys[0]),
            "Oldest key '{}' should have been evicted",
            unique_keys[0]
        );
        prop_assert!(cache.contains_key(&new_key));
        for key in unique_keys.iter().skip(1) {
            prop_assert!(cache.contains_key(key), "Key '{}' should remain", key);
        }
    }

    // After a get or put on an existing key, that key is the last to go.
    #[test]
    fn prop_lru_access_tracking(
        capacity in 2usize..8,
        touched in 0usize..8,
        touch_with_put in any::<bool>()
    ) {
        let touched = (touched % capacity) as u8;
        let mut cache = LruCache::new(capacity).unwrap();

        for key in 0..capacity as u8 {
            cache.put(key, 0u32);
        }
        if touch_with_put {
            cache.put(touched, 1);
        } else {
            cache.get(&touched);
        }

        // Push in capacity - 1 new keys; the touched key must survive them all
        for key in 100..100 + (capacity as u8 - 1) {
            cache.put(key, 0);
            prop_assert!(cache.contains_key(&touched));
        }
        // One more and it is the oldest left
        cache.put(200, 0);
        prop_assert!(!cache.contains_key(&touched));
    }
}

// Separate proptest block with fewer cases for time-sensitive TTL tests
proptest! {
    #![proptest_config(ProptestConfig::with_cases(5))]

    // A cleanup removes exactly the expired entries; an immediate second
    // cleanup removes nothing.
    #[test]
    fn prop_cleanup_idempotence(
        short_lived in prop::collection::hash_set(valid_key_strategy(), 0..20),
        long_lived in prop::collection::hash_set(valid_key_strategy(), 0..20)
    ) {
        let config = TtlConfig::new(Duration::from_secs(60), false, Duration::ZERO);
        let cache: TtlCache<String, u32> = TtlCache::with_config(config).unwrap();

        let long_lived: HashSet<String> = long_lived.difference(&short_lived).cloned().collect();
        for key in &short_lived {
            cache.put_with_ttl(key.clone(), 1, Duration::from_millis(10));
        }
        for key in &long_lived {
            cache.put(key.clone(), 2);
        }

        sleep(Duration::from_millis(30));

        prop_assert_eq!(cache.cleanup(), short_lived.len());
        prop_assert_eq!(cache.cleanup(), 0);
        prop_assert_eq!(cache.size(), long_lived.len());
        for key in &long_lived {
            prop_assert_eq!(cache.get(key), Some(2));
        }
    }
}
