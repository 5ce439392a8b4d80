//! Property-Based Tests for Cache Module
//!
//! Runs random operation sequences against the cache and a naive
//! VecDeque model, comparing results and eviction order.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use proptest::prelude::*;

use crate::cache::{BoundedCache, LruList};

// == Reference Model ==
/// Front = most recently used, back = least recently used.
#[derive(Debug, Default)]
struct Model {
    capacity: usize,
    order: VecDeque<(u8, u32)>,
    evicted: Vec<(u8, u32)>,
}

impl Model {
    fn position(&self, key: u8) -> Option<usize> {
        self.order.iter().position(|(k, _)| *k == key)
    }

    fn add(&mut self, key: u8, value: u32) {
        if let Some(pos) = self.position(key) {
            self.order.remove(pos);
            self.order.push_front((key, value));
            return;
        }
        self.order.push_front((key, value));
        if self.capacity > 0 && self.order.len() > self.capacity {
            let oldest = self.order.pop_back().unwrap();
            self.evicted.push(oldest);
        }
    }

    fn get(&mut self, key: u8) -> Option<u32> {
        let pos = self.position(key)?;
        let entry = self.order.remove(pos).unwrap();
        self.order.push_front(entry);
        Some(entry.1)
    }

    fn remove(&mut self, key: u8) -> bool {
        match self.position(key) {
            Some(pos) => {
                let entry = self.order.remove(pos).unwrap();
                self.evicted.push(entry);
                true
            }
            None => false,
        }
    }

    fn remove_oldest(&mut self) -> bool {
        match self.order.pop_back() {
            Some(entry) => {
                self.evicted.push(entry);
                true
            }
            None => false,
        }
    }

    fn clear(&mut self) {
        while let Some(entry) = self.order.pop_back() {
            self.evicted.push(entry);
        }
    }
}

// == Strategies ==
#[derive(Debug, Clone)]
enum CacheOp {
    Add { key: u8, value: u32 },
    Get { key: u8 },
    Remove { key: u8 },
    RemoveOldest,
    Clear,
}

/// Small key space so that updates, hits and removals actually happen.
fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        6 => (0u8..12, any::<u32>()).prop_map(|(key, value)| CacheOp::Add { key, value }),
        4 => (0u8..12).prop_map(|key| CacheOp::Get { key }),
        2 => (0u8..12).prop_map(|key| CacheOp::Remove { key }),
        1 => Just(CacheOp::RemoveOldest),
        1 => Just(CacheOp::Clear),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // Every operation returns what the model returns, and the callback
    // sees exactly the model's drops in the same order.
    #[test]
    fn prop_matches_reference_model(
        capacity in 0usize..6,
        ops in prop::collection::vec(cache_op_strategy(), 1..120)
    ) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let cache = BoundedCache::with_evict(capacity, move |k, v| sink.lock().push((k, v)));
        let mut model = Model { capacity, ..Model::default() };

        for op in ops {
            match op {
                CacheOp::Add { key, value } => {
                    cache.add(key, value);
                    model.add(key, value);
                }
                CacheOp::Get { key } => {
                    prop_assert_eq!(cache.get(&key), model.get(key));
                }
                CacheOp::Remove { key } => {
                    prop_assert_eq!(cache.remove(&key), model.remove(key));
                }
                CacheOp::RemoveOldest => {
                    prop_assert_eq!(cache.remove_oldest(), model.remove_oldest());
                }
                CacheOp::Clear => {
                    cache.clear();
                    model.clear();
                }
            }

            prop_assert_eq!(cache.len(), model.order.len());
            if capacity > 0 {
                prop_assert!(cache.len() <= capacity, "size {} over capacity {}", cache.len(), capacity);
            }
        }

        prop_assert_eq!(&*log.lock(), &model.evicted);
    }

    // Filling past capacity with distinct keys evicts them in insertion order.
    #[test]
    fn prop_overflow_evicts_in_insertion_order(
        capacity in 1usize..10,
        extra in 1usize..20
    ) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let cache = BoundedCache::with_evict(capacity, move |k: usize, _: usize| sink.lock().push(k));

        for key in 0..capacity + extra {
            cache.add(key, key);
        }

        prop_assert_eq!(cache.len(), capacity);
        prop_assert_eq!(&*log.lock(), &(0..extra).collect::<Vec<_>>());
        prop_assert_eq!(cache.stats().evictions, extra as u64);
    }

    // A get on the oldest key spares it from the next eviction.
    #[test]
    fn prop_get_protects_from_eviction(capacity in 2usize..10) {
        let cache = BoundedCache::new(capacity);
        for key in 0..capacity {
            cache.add(key, key);
        }

        prop_assert_eq!(cache.get(&0), Some(0));
        cache.add(capacity, capacity);

        prop_assert_eq!(cache.get(&0), Some(0));
        prop_assert_eq!(cache.get(&1), None);
    }

    // The list's iteration order agrees with the model after any sequence
    // of inserts, lookups and removals.
    #[test]
    fn prop_list_order_matches_model(ops in prop::collection::vec(cache_op_strategy(), 1..80)) {
        let mut list = LruList::new();
        let mut model = Model::default();

        for op in ops {
            match op {
                CacheOp::Add { key, value } => {
                    list.insert(key, value);
                    model.add(key, value);
                }
                CacheOp::Get { key } => {
                    prop_assert_eq!(list.get(&key).copied(), model.get(key));
                }
                CacheOp::Remove { key } => {
                    prop_assert_eq!(list.remove(&key).is_some(), model.remove(key));
                }
                CacheOp::RemoveOldest => {
                    prop_assert_eq!(list.pop_oldest().is_some(), model.remove_oldest());
                }
                CacheOp::Clear => {
                    while list.pop_oldest().is_some() {}
                    model.clear();
                }
            }

            let actual: Vec<(u8, u32)> = list.iter().map(|(k, v)| (*k, *v)).collect();
            let expected: Vec<(u8, u32)> = model.order.iter().copied().collect();
            prop_assert_eq!(actual, expected);
        }
    }
}
