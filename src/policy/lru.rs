//! Least Recently Used eviction engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                       LruCache<V> Layout                       │
//! │                                                                │
//! │   index: FxHashMap<String, SlotId>                             │
//! │   list:  IntrusiveList<Entry<V>>                               │
//! │                                                                │
//! │   ┌─────────┬────────┐       front              back          │
//! │   │   key   │ SlotId │        MRU                LRU          │
//! │   ├─────────┼────────┤         ▼                  ▼           │
//! │   │  "k3"   │  id_2  │──►   [k3,v3] ◄──► [k2,v2] ◄──► [k1,v1] │
//! │   │  "k2"   │  id_1  │       newest      older       evict    │
//! │   │  "k1"   │  id_0  │                                        │
//! │   └─────────┴────────┘                                        │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Entry cost is `len(key) + value.weight()`; the engine keeps
//! `current_cost <= capacity` (capacity 0 is unbounded). Hits move the
//! entry to the front; eviction takes from the back.
//!
//! Not thread-safe; wrap in
//! [`ConcurrentCache`](crate::cache::ConcurrentCache) for shared use.

use rustc_hash::FxHashMap;

use crate::ds::intrusive_list::IntrusiveList;
use crate::ds::slot_arena::SlotId;
use crate::traits::{CacheEngine, EvictionHook, Weighted};

#[derive(Debug)]
struct Entry<V> {
    key: String,
    value: V,
}

/// Recency-ordered bounded cache.
///
/// # Example
///
/// ```
/// use cachemesh::policy::LruCache;
/// use cachemesh::CacheEngine;
///
/// let mut cache = LruCache::new(0); // unbounded
/// cache.add("k1", "v1");
/// cache.add("k2", "v2");
/// assert_eq!(cache.get("k1"), Some(&"v1")); // k1 is now MRU
/// assert_eq!(cache.evict().map(|(k, _)| k), Some("k2".to_owned()));
/// ```
pub struct LruCache<V> {
    list: IntrusiveList<Entry<V>>,
    index: FxHashMap<String, SlotId>,
    capacity: usize,
    cost: usize,
    hook: Option<EvictionHook<V>>,
}

impl<V: Weighted> LruCache<V> {
    /// Creates an engine with a byte budget of `capacity`; 0 is unbounded.
    pub fn new(capacity: usize) -> Self {
        Self {
            list: IntrusiveList::new(),
            index: FxHashMap::default(),
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

    /// Looks up `key` without disturbing recency order.
    pub fn peek(&self, key: &str) -> Option<&V> {
        let id = *self.index.get(key)?;
        self.list.get(id).map(|entry| &entry.value)
    }

    /// Returns the entry next in line for eviction.
    pub fn peek_lru(&self) -> Option<(&str, &V)> {
        self.list.back().map(|entry| (entry.key.as_str(), &entry.value))
    }

    /// Drops the least recently used entry, fires the hook, and returns
    /// the pair. `None` when empty.
    pub fn evict(&mut self) -> Option<(String, V)> {
        let entry = self.list.pop_back()?;
        self.index.remove(&entry.key);
        self.cost -= entry.key.len() + entry.value.weight();
        if let Some(hook) = self.hook.as_mut() {
            hook(&entry.key, &entry.value);
        }
        Some((entry.key, entry.value))
    }

    /// Unlinks `key` without firing the hook; returns its value.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        let id = self.index.remove(key)?;
        let entry = self.list.remove(id)?;
        self.cost -= entry.key.len() + entry.value.weight();
        Some(entry.value)
    }
}

impl<V: Weighted> CacheEngine<V> for LruCache<V> {
    fn get(&mut self, key: &str) -> Option<&V> {
        let id = *self.index.get(key)?;
        self.list.move_to_front(id);
        self.list.get(id).map(|entry| &entry.value)
    }

    fn add(&mut self, key: &str, value: V) {
        if let Some(&id) = self.index.get(key) {
            self.list.move_to_front(id);
            if let Some(entry) = self.list.get_mut(id) {
                self.cost = self.cost - entry.value.weight() + value.weight();
                entry.value = value;
            }
            return;
        }

        let size = key.len() + value.weight();
        while self.capacity != 0 && self.cost + size > self.capacity {
            if self.evict().is_none() {
                break;
            }
        }
        // An entry larger than the whole budget never fits.
        if self.capacity != 0 && self.cost + size > self.capacity {
            return;
        }

        let id = self.list.push_front(Entry {
            key: key.to_owned(),
            value,
        });
        self.index.insert(key.to_owned(), id);
        self.cost += size;
    }

    fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    fn len(&self) -> usize {
        self.list.len()
    }

    fn current_cost(&self) -> usize {
        self.cost
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<V> std::fmt::Debug for LruCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruCache")
            .field("len", &self.list.len())
            .field("cost", &self.cost)
            .field("capacity", &self.capacity)
            .finish()
    }
}
