//! Least Frequently Used eviction engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        LfuCache<V> Layout                        │
//! │                                                                  │
//! │   index: FxHashMap<String, SlotId>     entries: SlotArena        │
//! │                                                                  │
//! │   buckets: FxHashMap<u64, Bucket>                                │
//! │                                                                  │
//! │     freq 1:  head ─► [k4] ◄──► [k3] ◄─ tail     ◄── min_freq    │
//! │     freq 3:  head ─► [k1] ◄─ tail                                │
//! │                                                                  │
//! │   Victim = tail of the min_freq bucket: least recently promoted  │
//! │   within the least frequent class.                               │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every hit moves an entry from its bucket to the front of the next
//! higher bucket. Buckets are deleted the moment they empty, and
//! `min_freq` always names the smallest live frequency (0 when empty).
//!
//! Not thread-safe; wrap in
//! [`ConcurrentCache`](crate::cache::ConcurrentCache) for shared use.

use rustc_hash::FxHashMap;

use crate::ds::slot_arena::{SlotArena, SlotId};
use crate::traits::{CacheEngine, EvictionHook, Weighted};

#[derive(Debug)]
struct Entry<V> {
    key: String,
    value: V,
    freq: u64,
    prev: Option<SlotId>,
    next: Option<SlotId>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Bucket {
    head: Option<SlotId>,
    tail: Option<SlotId>,
}

/// Frequency-ordered bounded cache with a min-frequency cursor.
///
/// # Example
///
/// ```
/// use cachemesh::policy::LfuCache;
/// use cachemesh::CacheEngine;
///
/// let mut cache = LfuCache::new(0);
/// cache.add("hot", "1");
/// cache.add("cold", "2");
/// cache.get("hot"); // frequency 2
/// assert_eq!(cache.evict().map(|(k, _)| k), Some("cold".to_owned()));
/// ```
pub struct LfuCache<V> {
    entries: SlotArena<Entry<V>>,
    index: FxHashMap<String, SlotId>,
    buckets: FxHashMap<u64, Bucket>,
    min_freq: u64,
    capacity: usize,
    cost: usize,
    hook: Option<EvictionHook<V>>,
}

impl<V: Weighted> LfuCache<V> {
    /// Creates an engine with a byte budget of `capacity`; 0 is unbounded.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: SlotArena::new(),
            index: FxHashMap::default(),
            buckets: FxHashMap::default(),
            min_freq: 0,
            capacity,
            cost: 0,
            hook: None,
        }
    }

    /// Creates an engine whose capacity evictions invoke `hook`.
    pub fn with_hook(capacity: usize, hook: EvictionHook<V>) -> Self {
        Self {
            hook: Some(hook),
            ..Self::new(capacity)
        }
    }

    /// Looks up `key` without bumping its frequency.
    pub fn peek(&self, key: &str) -> Option<&V> {
        let id = *self.index.get(key)?;
        self.entries.get(id).map(|entry| &entry.value)
    }

    /// Returns the access frequency of `key`.
    pub fn frequency(&self, key: &str) -> Option<u64> {
        let id = *self.index.get(key)?;
        self.entries.get(id).map(|entry| entry.freq)
    }

    /// Smallest live frequency, or 0 when the engine is empty.
    pub fn min_freq(&self) -> u64 {
        self.min_freq
    }

    /// Drops the least recently promoted entry of the least frequent
    /// class, fires the hook, and returns the pair. `None` when empty.
    pub fn evict(&mut self) -> Option<(String, V)> {
        if self.entries.is_empty() {
            return None;
        }
        let victim = self.buckets.get(&self.min_freq)?.tail?;
        let freq = self.entries.get(victim)?.freq;
        self.bucket_unlink(freq, victim);
        let entry = self.entries.remove(victim)?;
        self.index.remove(&entry.key);
        self.cost -= entry.key.len() + entry.value.weight();
        self.restore_min_freq(freq);
        if let Some(hook) = self.hook.as_mut() {
            hook(&entry.key, &entry.value);
        }
        Some((entry.key, entry.value))
    }

    /// Unlinks `key` without firing the hook; returns its value.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        let id = self.index.remove(key)?;
        let freq = self.entries.get(id)?.freq;
        self.bucket_unlink(freq, id);
        let entry = self.entries.remove(id)?;
        self.cost -= entry.key.len() + entry.value.weight();
        self.restore_min_freq(freq);
        Some(entry.value)
    }

    /// Moves `id` from its current bucket to the front of the next one.
    fn bump(&mut self, id: SlotId) {
        let freq = match self.entries.get(id) {
            Some(entry) => entry.freq,
            None => return,
        };
        self.bucket_unlink(freq, id);
        if let Some(entry) = self.entries.get_mut(id) {
            entry.freq = freq + 1;
        }
        self.bucket_push_front(freq + 1, id);
        if freq == self.min_freq && !self.buckets.contains_key(&freq) {
            self.min_freq = freq + 1;
        }
    }

    /// After the bucket at `freed` emptied, re-point `min_freq` at the
    /// smallest live frequency (0 when the engine is empty).
    fn restore_min_freq(&mut self, freed: u64) {
        if freed != self.min_freq || self.buckets.contains_key(&freed) {
            return;
        }
        if self.entries.is_empty() {
            self.min_freq = 0;
            return;
        }
        let mut next = freed + 1;
        while !self.buckets.contains_key(&next) {
            next += 1;
        }
        self.min_freq = next;
    }

    fn bucket_push_front(&mut self, freq: u64, id: SlotId) {
        let bucket = self.buckets.entry(freq).or_default();
        let old_head = bucket.head;
        bucket.head = Some(id);
        if bucket.tail.is_none() {
            bucket.tail = Some(id);
        }
        if let Some(entry) = self.entries.get_mut(id) {
            entry.prev = None;
            entry.next = old_head;
        }
        if let Some(old) = old_head {
            if let Some(entry) = self.entries.get_mut(old) {
                entry.prev = Some(id);
            }
        }
    }

    /// Unlinks `id` from the bucket at `freq`, deleting the bucket if it
    /// empties.
    fn bucket_unlink(&mut self, freq: u64, id: SlotId) {
        let (prev, next) = match self.entries.get(id) {
            Some(entry) => (entry.prev, entry.next),
            None => return,
        };

        match prev {
            Some(prev_id) => {
                if let Some(entry) = self.entries.get_mut(prev_id) {
                    entry.next = next;
                }
            }
            None => {
                if let Some(bucket) = self.buckets.get_mut(&freq) {
                    bucket.head = next;
                }
            }
        }
        match next {
            Some(next_id) => {
                if let Some(entry) = self.entries.get_mut(next_id) {
                    entry.prev = prev;
                }
            }
            None => {
                if let Some(bucket) = self.buckets.get_mut(&freq) {
                    bucket.tail = prev;
                }
            }
        }
        if let Some(entry) = self.entries.get_mut(id) {
            entry.prev = None;
            entry.next = None;
        }

        if self
            .buckets
            .get(&freq)
            .is_some_and(|bucket| bucket.head.is_none())
        {
            self.buckets.remove(&freq);
        }
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        assert_eq!(self.entries.len(), self.index.len());

        let mut counted = 0usize;
        let mut smallest = None;
        for (&freq, bucket) in &self.buckets {
            assert!(bucket.head.is_some(), "empty bucket at freq {freq}");
            let mut current = bucket.head;
            while let Some(id) = current {
                let entry = self.entries.get(id).expect("bucket node missing");
                assert_eq!(entry.freq, freq);
                current = entry.next;
                counted += 1;
                assert!(counted <= self.entries.len(), "cycle in bucket {freq}");
            }
            smallest = Some(smallest.map_or(freq, |s: u64| s.min(freq)));
        }
        assert_eq!(counted, self.entries.len());
        assert_eq!(self.min_freq, smallest.unwrap_or(0));
    }
}

impl<V: Weighted> CacheEngine<V> for LfuCache<V> {
    fn get(&mut self, key: &str) -> Option<&V> {
        let id = *self.index.get(key)?;
        self.bump(id);
        self.entries.get(id).map(|entry| &entry.value)
    }

    fn add(&mut self, key: &str, value: V) {
        if let Some(&id) = self.index.get(key) {
            if let Some(entry) = self.entries.get_mut(id) {
                self.cost = self.cost - entry.value.weight() + value.weight();
                entry.value = value;
            }
            self.bump(id);
            return;
        }

        let size = key.len() + value.weight();
        while self.capacity != 0 && self.cost + size > self.capacity {
            if self.evict().is_none() {
                break;
            }
        }
        if self.capacity != 0 && self.cost + size > self.capacity {
            return;
        }

        let id = self.entries.insert(Entry {
            key: key.to_owned(),
            value,
            freq: 1,
            prev: None,
            next: None,
        });
        self.index.insert(key.to_owned(), id);
        self.bucket_push_front(1, id);
        self.min_freq = 1;
        self.cost += size;
    }

    fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn current_cost(&self) -> usize {
        self.cost
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<V> std::fmt::Debug for LfuCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LfuCache")
            .field("len", &self.entries.len())
            .field("min_freq", &self.min_freq)
            .field("cost", &self.cost)
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn get_bumps_frequency() {
        let mut cache = LfuCache::new(0);
        cache.add("k", "v");
        assert_eq!(cache.frequency("k"), Some(1));
        cache.get("k");
        cache.get("k");
        assert_eq!(cache.frequency("k"), Some(3));
        cache.debug_validate_invariants();
    }

    #[test]
    fn evict_takes_least_frequent_then_least_recent() {
        let mut cache = LfuCache::new(0);
        cache.add("a", "1");
        cache.add("b", "2");
        cache.add("c", "3");
        cache.get("a"); // a: 2, b: 1, c: 1

        // b and c tie at frequency 1; b was promoted least recently.
        assert_eq!(cache.evict().map(|(k, _)| k), Some("b".to_owned()));
        assert_eq!(cache.evict().map(|(k, _)| k), Some("c".to_owned()));
        assert_eq!(cache.evict().map(|(k, _)| k), Some("a".to_owned()));
        assert_eq!(cache.evict(), None);
        assert_eq!(cache.min_freq(), 0);
        cache.debug_validate_invariants();
    }

    #[test]
    fn capacity_pressure_reports_evictions_in_order() {
        let evicted = Arc::new(Mutex::new(Vec::new()));
        let seen = evicted.clone();
        let mut cache = LfuCache::with_hook(
            10,
            Box::new(move |key, _value: &&str| {
                seen.lock().unwrap().push(key.to_owned());
            }),
        );

        cache.add("key1", "123456"); // cost 10
        cache.add("k2", "k2"); // evicts key1, cost 4
        cache.add("k3", "k3"); // cost 8
        cache.add("k4", "k4"); // evicts k2, cost 8

        assert_eq!(*evicted.lock().unwrap(), vec!["key1", "k2"]);
        assert!(cache.contains("k3"));
        assert!(cache.contains("k4"));
        assert_eq!(cache.frequency("k3"), Some(1));
        assert_eq!(cache.frequency("k4"), Some(1));
        assert_eq!(cache.len(), 2);
        cache.debug_validate_invariants();
    }

    #[test]
    fn update_bumps_like_a_hit() {
        let mut cache = LfuCache::new(0);
        cache.add("k", "old");
        cache.add("k", "new");
        assert_eq!(cache.frequency("k"), Some(2));
        assert_eq!(cache.peek("k"), Some(&"new"));
        assert_eq!(cache.current_cost(), 1 + 3);
        cache.debug_validate_invariants();
    }

    #[test]
    fn min_freq_advances_when_its_bucket_empties() {
        let mut cache = LfuCache::new(0);
        cache.add("a", "1");
        cache.add("b", "2");
        cache.get("a");
        cache.get("b");
        // Both at frequency 2; bucket 1 is gone.
        assert_eq!(cache.min_freq(), 2);
        cache.debug_validate_invariants();
    }

    #[test]
    fn remove_rescans_min_freq_upward() {
        let mut cache = LfuCache::new(0);
        cache.add("hot", "1");
        cache.get("hot");
        cache.get("hot"); // hot: 3
        cache.add("cold", "2"); // cold: 1, min_freq 1

        assert_eq!(cache.remove("cold"), Some("2"));
        assert_eq!(cache.min_freq(), 3);
        cache.debug_validate_invariants();

        assert_eq!(cache.remove("hot"), Some("1"));
        assert_eq!(cache.min_freq(), 0);
        assert!(cache.is_empty());
        cache.debug_validate_invariants();
    }

    #[test]
    fn remove_skips_the_hook() {
        let evicted = Arc::new(Mutex::new(Vec::new()));
        let seen = evicted.clone();
        let mut cache: LfuCache<&str> = LfuCache::with_hook(
            0,
            Box::new(move |key, _| seen.lock().unwrap().push(key.to_owned())),
        );
        cache.add("k", "v");
        cache.remove("k");
        assert!(evicted.lock().unwrap().is_empty());
    }

    #[test]
    fn new_insert_resets_min_freq_to_one() {
        let mut cache = LfuCache::new(0);
        cache.add("a", "1");
        cache.get("a"); // min_freq 2
        cache.add("b", "2");
        assert_eq!(cache.min_freq(), 1);
        cache.debug_validate_invariants();
    }

    #[test]
    fn entry_larger_than_capacity_is_dropped() {
        let mut cache = LfuCache::new(3);
        cache.add("key", "value");
        assert!(cache.is_empty());
        assert_eq!(cache.current_cost(), 0);
        assert_eq!(cache.min_freq(), 0);
        cache.debug_validate_invariants();
    }

    #[test]
    fn cost_accounting_survives_churn() {
        let mut cache = LfuCache::new(0);
        cache.add("a", "xx");
        cache.add("bb", "yyy");
        cache.get("a");
        cache.add("a", "z");
        assert_eq!(cache.current_cost(), (1 + 1) + (2 + 3));
        cache.remove("bb");
        cache.evict();
        assert_eq!(cache.current_cost(), 0);
        cache.debug_validate_invariants();
    }
}
