//! Integration Tests for the Bounded Cache
//!
//! Exercises the public cache API from multiple threads.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use session_guard::BoundedCache;

// == Helper Functions ==

fn counting_cache(capacity: usize) -> (Arc<BoundedCache<String, u64>>, Arc<AtomicU64>) {
    let evicted = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&evicted);
    let cache = BoundedCache::with_evict(capacity, move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    (Arc::new(cache), evicted)
}

// == Scenario Tests ==

#[test]
fn test_get_refreshes_recency_scenario() {
    let cache = BoundedCache::new(2);

    cache.add("a", 1);
    cache.add("b", 2);
    assert_eq!(cache.get("a"), Some(1));
    cache.add("c", 3);

    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get("a"), Some(1));
    assert_eq!(cache.get("b"), None);
    assert_eq!(cache.get("c"), Some(3));
}

#[test]
fn test_unbounded_cache_is_caller_managed() {
    let (cache, evicted) = counting_cache(0);

    for i in 0..500u64 {
        cache.add(format!("k{i}"), i);
    }
    assert_eq!(cache.len(), 500);
    assert_eq!(evicted.load(Ordering::SeqCst), 0);

    while cache.len() > 100 {
        assert!(cache.remove_oldest());
    }
    assert_eq!(cache.get("k399"), None);
    assert_eq!(cache.get("k400"), Some(400));
    assert_eq!(evicted.load(Ordering::SeqCst), 400);
}

// == Concurrency Tests ==

#[test]
fn test_concurrent_adds_respect_capacity() {
    const CAPACITY: usize = 64;
    const THREADS: u64 = 8;
    const PER_THREAD: u64 = 1_000;

    let (cache, evicted) = counting_cache(CAPACITY);

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    cache.add(format!("t{t}-{i}"), i);
                    assert!(cache.len() <= CAPACITY);
                    cache.get(&format!("t{t}-{}", i / 2));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let stats = cache.stats();
    assert_eq!(cache.len(), CAPACITY);
    assert_eq!(stats.inserts, THREADS * PER_THREAD);
    assert_eq!(stats.evictions, evicted.load(Ordering::SeqCst));
    assert_eq!(stats.inserts - stats.evictions, CAPACITY as u64);
    assert_eq!(stats.hits + stats.misses, THREADS * PER_THREAD);
}

#[test]
fn test_concurrent_clear_and_add() {
    let (cache, evicted) = counting_cache(32);

    let writer = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            for i in 0..2_000u64 {
                cache.add(format!("w{}", i % 100), i);
            }
        })
    };
    let clearer = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            for _ in 0..50 {
                cache.clear();
                thread::yield_now();
            }
        })
    };
    writer.join().unwrap();
    clearer.join().unwrap();

    // every entry that ever got in has either left through the callback or is still here
    let stats = cache.stats();
    assert!(cache.len() <= 32);
    assert_eq!(
        stats.inserts,
        evicted.load(Ordering::SeqCst) + cache.len() as u64
    );
}
