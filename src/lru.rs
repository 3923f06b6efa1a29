//! A small bounded memoizing cache with least-recently-used eviction.
//!
//! Generic over key and value so the tile cache stays a thin type alias
//! rather than owning container logic. Strictly count-based (no size
//! weighting), single-threaded, no internal synchronization.
//!
//! Recency is tracked with a monotonic stamp per entry plus a queue of
//! `(stamp, key)` pairs. Promotion pushes a fresh pair and eviction pops
//! from the front, skipping pairs whose stamp no longer matches the live
//! entry. This keeps both promote and evict O(1) amortized; the queue is
//! compacted once it grows well past the live entry count.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

struct Entry<V> {
    value: V,
    stamp: u64,
}

pub struct LruCache<K, V> {
    cap: usize,
    map: HashMap<K, Entry<V>>,
    order: VecDeque<(u64, K)>,
    next_stamp: u64,
}

impl<K: Eq + Hash + Copy, V> LruCache<K, V> {
    pub fn new(cap: usize) -> Self {
        assert!(cap > 0, "LruCache capacity must be non-zero");
        Self {
            cap,
            map: HashMap::new(),
            order: VecDeque::new(),
            next_stamp: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Look up a value, promoting the key to most-recently-used on a hit.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let stamp = self.next_stamp;
        let entry = self.map.get_mut(key)?;
        entry.stamp = stamp;
        self.next_stamp += 1;
        self.order.push_back((stamp, *key));
        self.maybe_compact();
        Some(&self.map[key].value)
    }

    /// Insert (or replace) a value as most-recently-used, then evict
    /// least-recently-used entries until the capacity bound holds.
    pub fn insert(&mut self, key: K, value: V) {
        let stamp = self.next_stamp;
        self.next_stamp += 1;
        self.map.insert(key, Entry { value, stamp });
        self.order.push_back((stamp, key));
        while self.map.len() > self.cap {
            let Some((old_stamp, old_key)) = self.order.pop_front() else {
                break;
            };
            // Stale pair: the key was promoted (or replaced) since.
            if self
                .map
                .get(&old_key)
                .is_some_and(|e| e.stamp == old_stamp)
            {
                self.map.remove(&old_key);
            }
        }
        self.maybe_compact();
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.order.clear();
    }

    /// Drop stale promotion records once the queue is dominated by them.
    fn maybe_compact(&mut self) {
        if self.order.len() > self.map.len() * 2 + 64 {
            let map = &self.map;
            self.order
                .retain(|(stamp, key)| map.get(key).is_some_and(|e| e.stamp == *stamp));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_least_recently_used_at_capacity() {
        let mut cache = LruCache::new(200);
        for i in 0..201u32 {
            cache.insert((i, 0u32), i);
        }
        // Key 0 was the oldest untouched entry; the other 200 remain.
        assert_eq!(cache.len(), 200);
        assert!(!cache.contains(&(0, 0)));
        for i in 1..201u32 {
            assert!(cache.contains(&(i, 0)));
        }
    }

    #[test]
    fn test_get_promotes() {
        let mut cache = LruCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        assert_eq!(cache.get(&"a"), Some(&1));
        cache.insert("c", 3);
        // "b" was least-recently-used after the promotion of "a".
        assert!(cache.contains(&"a"));
        assert!(!cache.contains(&"b"));
        assert!(cache.contains(&"c"));
    }

    #[test]
    fn test_reinsert_refreshes_recency() {
        let mut cache = LruCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("a", 10);
        cache.insert("c", 3);
        assert_eq!(cache.get(&"a"), Some(&10));
        assert!(!cache.contains(&"b"));
    }

    #[test]
    fn test_clear() {
        let mut cache = LruCache::new(4);
        cache.insert(1, ());
        cache.insert(2, ());
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get(&1), None);
    }

    #[test]
    fn test_heavy_promotion_stays_bounded() {
        let mut cache = LruCache::new(8);
        for i in 0..8 {
            cache.insert(i, i);
        }
        // Hammer promotions to force queue compaction.
        for _ in 0..1000 {
            for i in 0..8 {
                assert!(cache.get(&i).is_some());
            }
        }
        assert_eq!(cache.len(), 8);
        assert!(cache.order.len() <= 8 * 2 + 64 + 1);
    }
}
