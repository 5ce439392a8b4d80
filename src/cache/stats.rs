//! Cache Statistics Module
//!
//! Counters describing how a bounded cache has been used.

use serde::Serialize;

// == Cache Stats ==
/// Snapshot of cache activity since construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups that found their key
    pub hits: u64,
    /// Lookups that did not
    pub misses: u64,
    /// Adds that created a new entry
    pub inserts: u64,
    /// Adds that replaced the value of an existing entry
    pub updates: u64,
    /// Entries dropped because the cache overflowed its capacity
    pub evictions: u64,
    /// Entries dropped by remove, remove_oldest or clear
    pub removals: u64,
    /// Entries currently held
    pub total_entries: usize,
    /// Configured capacity (0 = unbounded)
    pub capacity: usize,
}

impl CacheStats {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Fraction of lookups that hit, or 0.0 before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        match self.hits + self.misses {
            0 => 0.0,
            total => self.hits as f64 / total as f64,
        }
    }

    pub(crate) fn record_lookup(&mut self, hit: bool) {
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }

    pub(crate) fn record_add(&mut self, replaced: bool) {
        if replaced {
            self.updates += 1;
        } else {
            self.inserts += 1;
        }
    }

    pub(crate) fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub(crate) fn record_removal(&mut self) {
        self.removals += 1;
    }
}
