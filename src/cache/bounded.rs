//! Bounded Cache Module
//!
//! Thread-safe LRU cache with a fixed capacity and an optional eviction callback.

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;

use parking_lot::RwLock;
use tracing::debug;

use crate::cache::{CacheStats, LruList};

/// Upper bound on slots reserved up front for large capacities.
const PREALLOCATE_LIMIT: usize = 1024;

/// Callback receiving every entry the cache drops.
pub type EvictFn<K, V> = Box<dyn FnMut(K, V) + Send + Sync>;

struct Inner<K, V> {
    entries: LruList<K, V>,
    stats: CacheStats,
    on_evict: Option<EvictFn<K, V>>,
}

impl<K, V> Inner<K, V> {
    fn evicted(&mut self, key: K, value: V) {
        if let Some(on_evict) = self.on_evict.as_mut() {
            on_evict(key, value);
        }
    }
}

// == Bounded Cache ==
/// An LRU cache that is safe for concurrent access.
///
/// Every method that can touch recency order, including [`get`](Self::get),
/// takes the exclusive lock for its whole duration. [`len`](Self::len),
/// [`stats`](Self::stats) and the `peek*`/`contains` lookups share a read
/// lock.
///
/// The eviction callback runs while the exclusive lock is held. It must not
/// call back into the same cache or it will deadlock.
///
/// # Example
/// ```
/// use session_guard::BoundedCache;
///
/// let cache = BoundedCache::new(2);
/// cache.add("a", 1);
/// cache.add("b", 2);
/// cache.get("a");
/// cache.add("c", 3);
///
/// assert_eq!(cache.get("b"), None);
/// assert_eq!(cache.len(), 2);
/// ```
pub struct BoundedCache<K, V> {
    capacity: usize,
    inner: RwLock<Inner<K, V>>,
}

impl<K: Eq + Hash + Clone, V: Clone> BoundedCache<K, V> {
    // == Constructors ==
    /// Creates a cache holding at most `capacity` entries.
    ///
    /// A capacity of zero disables automatic eviction; the caller is then
    /// responsible for calling [`remove`](Self::remove),
    /// [`remove_oldest`](Self::remove_oldest) or [`clear`](Self::clear).
    pub fn new(capacity: usize) -> Self {
        Self::build(capacity, None)
    }

    /// Creates a cache that reports every dropped entry to `on_evict`.
    ///
    /// The callback fires once per entry removed by overflow, `remove`,
    /// `remove_oldest` or `clear`. Replacing a value with `add` does not
    /// fire it.
    pub fn with_evict<F>(capacity: usize, on_evict: F) -> Self
    where
        F: FnMut(K, V) + Send + Sync + 'static,
    {
        Self::build(capacity, Some(Box::new(on_evict)))
    }

    fn build(capacity: usize, on_evict: Option<EvictFn<K, V>>) -> Self {
        Self {
            capacity,
            inner: RwLock::new(Inner {
                entries: LruList::with_capacity(capacity.min(PREALLOCATE_LIMIT)),
                stats: CacheStats::new(capacity),
                on_evict,
            }),
        }
    }

    // == Add ==
    /// Stores `value` under `key` and marks it most recently used.
    ///
    /// Overwriting an existing key never evicts. Inserting a new key into a
    /// full cache evicts exactly the least recently used entry.
    pub fn add(&self, key: K, value: V) {
        let mut inner = self.inner.write();

        let replaced = inner.entries.insert(key, value).is_some();
        inner.stats.record_add(replaced);
        if replaced || self.capacity == 0 || inner.entries.len() <= self.capacity {
            return;
        }

        if let Some((key, value)) = inner.entries.pop_oldest() {
            inner.stats.record_eviction();
            debug!(capacity = self.capacity, "evicting least recently used entry");
            inner.evicted(key, value);
        }
    }

    // == Get ==
    /// Returns a copy of the value for `key`, marking it most recently used.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut inner = self.inner.write();
        let value = inner.entries.get(key).cloned();
        inner.stats.record_lookup(value.is_some());
        value
    }

    /// Returns a copy of the value for `key` without touching recency or
    /// the hit/miss counters. Shares the read lock.
    pub fn peek<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.read().entries.peek(key).cloned()
    }

    /// Checks for `key` without touching recency.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.read().entries.contains(key)
    }

    /// Returns the entry that the next eviction would drop.
    pub fn peek_oldest(&self) -> Option<(K, V)> {
        self.inner
            .read()
            .entries
            .peek_oldest()
            .map(|(k, v)| (k.clone(), v.clone()))
    }

    // == Remove ==
    /// Removes `key`, returning whether an entry was present.
    pub fn remove<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut inner = self.inner.write();
        match inner.entries.remove(key) {
            Some((key, value)) => {
                inner.stats.record_removal();
                inner.evicted(key, value);
                true
            }
            None => false,
        }
    }

    /// Removes the least recently used entry, returning whether the cache
    /// had one.
    pub fn remove_oldest(&self) -> bool {
        let mut inner = self.inner.write();
        match inner.entries.pop_oldest() {
            Some((key, value)) => {
                inner.stats.record_removal();
                inner.evicted(key, value);
                true
            }
            None => false,
        }
    }

    // == Clear ==
    /// Removes every entry, oldest first, firing the callback for each.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        let mut dropped = 0usize;
        while let Some((key, value)) = inner.entries.pop_oldest() {
            inner.stats.record_removal();
            inner.evicted(key, value);
            dropped += 1;
        }
        if dropped > 0 {
            debug!(dropped, "cache cleared");
        }
    }

    // == Accessors ==
    /// Returns the number of entries currently held.
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the configured capacity (0 = unbounded).
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns a snapshot of the usage counters.
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.read();
        CacheStats {
            total_entries: inner.entries.len(),
            ..inner.stats.clone()
        }
    }
}

impl<K, V> fmt::Debug for BoundedCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("BoundedCache");
        out.field("capacity", &self.capacity);
        // try_read: Debug may be reached from inside the eviction callback
        match self.inner.try_read() {
            Some(inner) => out.field("len", &inner.entries.len()),
            None => out.field("len", &"<locked>"),
        };
        out.finish()
    }
}
