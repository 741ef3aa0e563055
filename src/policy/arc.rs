//! Adaptive Replacement Cache eviction engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         ArcCache<V> Layout                          │
//! │                                                                     │
//! │   Live entries (share one byte budget C)                            │
//! │                                                                     │
//! │   T1 recent (LruCache)                T2 frequent (LfuCache)        │
//! │   ┌────────────────────┐              ┌────────────────────┐        │
//! │   │ seen once, recency │  hit ──────► │ seen again, freq   │        │
//! │   │ ordered            │              │ buckets            │        │
//! │   └─────────┬──────────┘              └─────────┬──────────┘        │
//! │             │ evict (replace)                   │ evict (replace)   │
//! │             ▼                                   ▼                   │
//! │   B1 ghost (keys only)                B2 ghost (keys only)          │
//! │   ┌────────────────────┐              ┌────────────────────┐        │
//! │   │ hit: p grows,      │              │ hit: p shrinks,    │        │
//! │   │ favor recency      │              │ favor frequency    │        │
//! │   └────────────────────┘              └────────────────────┘        │
//! │                                                                     │
//! │   p in [0, C]: byte share of the budget reserved for T1.            │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A key lives in at most one of the four lists. Ghost hits prove the
//! cache evicted something it should have kept, so they re-admit the key
//! straight into T2 and shift `p` toward the side that would have kept it.
//! The shift is the entry cost scaled by the ghost length ratio (clamped
//! to at least 1) to damp oscillation when one ghost list dominates.
//!
//! `replace` picks the victim side: T1 when it is over its `p` share (or
//! exactly at it on a B2 hit), otherwise T2. The victim's value is
//! dropped and its key recorded in the matching ghost list.
//!
//! Not thread-safe; wrap in
//! [`ConcurrentCache`](crate::cache::ConcurrentCache) for shared use.

use crate::ds::ghost_list::GhostList;
use crate::policy::lfu::LfuCache;
use crate::policy::lru::LruCache;
use crate::traits::{CacheEngine, EvictionHook, Weighted};

/// Adaptive engine blending recency and frequency with ghost feedback.
///
/// # Example
///
/// ```
/// use cachemesh::policy::ArcCache;
/// use cachemesh::CacheEngine;
///
/// let mut cache = ArcCache::new(64);
/// cache.add("page", "body");
/// assert_eq!(cache.get("page"), Some(&"body")); // promoted to T2
/// assert_eq!(cache.get("other"), None);
/// ```
pub struct ArcCache<V> {
    /// T1: entries seen exactly once, recency ordered.
    recent: LruCache<V>,
    /// T2: entries seen more than once, frequency ordered.
    frequent: LfuCache<V>,
    /// B1: keys recently evicted from T1.
    ghost_recent: GhostList,
    /// B2: keys recently evicted from T2.
    ghost_frequent: GhostList,
    /// Byte share of the budget reserved for T1.
    p: usize,
    capacity: usize,
    hook: Option<EvictionHook<V>>,
}

impl<V: Weighted> ArcCache<V> {
    /// Creates an engine with a byte budget of `capacity`; 0 is unbounded.
    ///
    /// The sub-caches are created with the full budget; they only act as a
    /// backstop, since `replace` drives eviction from the outside.
    pub fn new(capacity: usize) -> Self {
        Self {
            recent: LruCache::new(capacity),
            frequent: LfuCache::new(capacity),
            ghost_recent: GhostList::new(capacity),
            ghost_frequent: GhostList::new(capacity),
            p: 0,
            capacity,
            hook: None,
        }
    }

    /// Creates an engine whose live evictions invoke `hook`.
    ///
    /// The hook fires when a value is dropped on the live-to-ghost move;
    /// ghost-list trims carry no value and are silent.
    pub fn with_hook(capacity: usize, hook: EvictionHook<V>) -> Self {
        Self {
            hook: Some(hook),
            ..Self::new(capacity)
        }
    }

    /// Current byte share of the budget favoring T1.
    pub fn p_value(&self) -> usize {
        self.p
    }

    /// Number of entries in T1.
    pub fn recent_len(&self) -> usize {
        self.recent.len()
    }

    /// Number of entries in T2.
    pub fn frequent_len(&self) -> usize {
        self.frequent.len()
    }

    /// Number of keys in B1.
    pub fn ghost_recent_len(&self) -> usize {
        self.ghost_recent.len()
    }

    /// Number of keys in B2.
    pub fn ghost_frequent_len(&self) -> usize {
        self.ghost_frequent.len()
    }

    fn live_cost(&self) -> usize {
        self.recent.current_cost() + self.frequent.current_cost()
    }

    /// Replaces live entries until an incoming entry of `size` bytes fits.
    ///
    /// With unit costs one replacement is enough; with byte costs a large
    /// entry may need several victims to keep the live budget intact.
    fn make_room(&mut self, incoming: &str, size: usize) {
        if self.capacity == 0 {
            return;
        }
        while self.live_cost() + size > self.capacity {
            if self.recent.is_empty() && self.frequent.is_empty() {
                break;
            }
            self.replace(incoming);
        }
    }

    /// Evicts one live entry, moving its key to the matching ghost list.
    ///
    /// T1 gives up its LRU entry when it holds more than its `p` share, or
    /// exactly `p` while re-admitting a B2 ghost; otherwise T2 gives up
    /// its least frequent entry. Falls back to whichever side has entries.
    fn replace(&mut self, incoming: &str) {
        let from_recent = !self.recent.is_empty()
            && (self.recent.current_cost() > self.p
                || (self.ghost_frequent.contains(incoming)
                    && self.recent.current_cost() == self.p));

        let evicted = if from_recent {
            self.recent.evict().map(|(key, value)| {
                self.ghost_recent.record(&key);
                (key, value)
            })
        } else if !self.frequent.is_empty() {
            self.frequent.evict().map(|(key, value)| {
                self.ghost_frequent.record(&key);
                (key, value)
            })
        } else {
            self.recent.evict().map(|(key, value)| {
                self.ghost_recent.record(&key);
                (key, value)
            })
        };

        if let Some((key, value)) = evicted {
            if let Some(hook) = self.hook.as_mut() {
                hook(&key, &value);
            }
        }
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        if self.capacity != 0 {
            assert!(self.p <= self.capacity, "p exceeds capacity");
            assert!(
                self.live_cost() <= self.capacity,
                "live cost {} exceeds capacity {}",
                self.live_cost(),
                self.capacity
            );
            assert!(self.ghost_recent.cost() <= self.capacity);
            assert!(self.ghost_frequent.cost() <= self.capacity);
        }
    }
}

impl<V: Weighted> CacheEngine<V> for ArcCache<V> {
    fn get(&mut self, key: &str) -> Option<&V> {
        // Second touch of a once-seen entry proves reuse: move T1 -> T2.
        if self.recent.contains(key) {
            if let Some(value) = self.recent.remove(key) {
                self.frequent.add(key, value);
            }
            return self.frequent.peek(key);
        }
        self.frequent.get(key)
    }

    fn add(&mut self, key: &str, value: V) {
        // Live hit in T1: promote with the new value.
        if self.recent.contains(key) {
            self.recent.remove(key);
            self.frequent.add(key, value);
            return;
        }
        // Live hit in T2: plain update.
        if self.frequent.contains(key) {
            self.frequent.add(key, value);
            return;
        }

        let size = key.len() + value.weight();

        // Ghost hit in B1: the recency side deserved more room.
        if self.ghost_recent.contains(key) {
            let mut delta = size;
            if self.ghost_recent.cost() < self.ghost_frequent.cost() {
                let ratio =
                    (self.ghost_frequent.len() / self.ghost_recent.len()).max(1);
                delta = ratio * size;
            }
            self.p = if self.capacity == 0 {
                self.p + delta
            } else {
                (self.p + delta).min(self.capacity)
            };

            self.make_room(key, size);
            self.ghost_recent.remove(key);
            self.frequent.add(key, value);
            return;
        }

        // Ghost hit in B2: the frequency side deserved more room.
        if self.ghost_frequent.contains(key) {
            let mut delta = size;
            if self.ghost_recent.cost() > self.ghost_frequent.cost() {
                let ratio =
                    (self.ghost_recent.len() / self.ghost_frequent.len()).max(1);
                delta = ratio * size;
            }
            self.p = self.p.saturating_sub(delta);

            self.make_room(key, size);
            self.ghost_frequent.remove(key);
            self.frequent.add(key, value);
            return;
        }

        // Entirely new key.
        if self.capacity != 0 {
            self.make_room(key, size);
            if self.ghost_recent.cost() > self.capacity - self.p {
                self.ghost_recent.evict_oldest();
            }
            if self.ghost_frequent.cost() > self.p {
                self.ghost_frequent.evict_oldest();
            }
        }
        self.recent.add(key, value);
    }

    fn contains(&self, key: &str) -> bool {
        self.recent.contains(key) || self.frequent.contains(key)
    }

    fn len(&self) -> usize {
        self.recent.len() + self.frequent.len()
    }

    fn current_cost(&self) -> usize {
        self.live_cost()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<V: Weighted> std::fmt::Debug for ArcCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArcCache")
            .field("recent_len", &self.recent.len())
            .field("frequent_len", &self.frequent.len())
            .field("ghost_recent_len", &self.ghost_recent.len())
            .field("ghost_frequent_len", &self.ghost_frequent.len())
            .field("p", &self.p)
            .field("capacity", &self.capacity)
            .finish()
    }
}
