//! Cache Module
//!
//! Provides a concurrency-safe, capacity-bounded cache with LRU eviction.

mod bounded;
mod lru;
mod stats;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use bounded::{BoundedCache, EvictFn};
pub use lru::{Iter, LruList};
pub use stats::CacheStats;
