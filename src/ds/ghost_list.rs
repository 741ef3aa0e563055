//! Bounded recency list of evicted keys.
//!
//! Ghost entries record *that* a key was recently evicted, never its value.
//! The adaptive engine consults them to detect re-references that justify
//! shifting its bias between recency and frequency. Costs here are key
//! bytes only, the same metric the live lists use for the key half of an
//! entry, so ghost budgets are comparable with the adaptation parameter.

use rustc_hash::FxHashMap;

use crate::ds::intrusive_list::IntrusiveList;
use crate::ds::slot_arena::SlotId;

/// Bounded key-only recency list. Front is most recently recorded.
#[derive(Debug)]
pub struct GhostList {
    list: IntrusiveList<String>,
    index: FxHashMap<String, SlotId>,
    capacity: usize,
    cost: usize,
}

impl GhostList {
    /// Creates a ghost list with a byte budget of `capacity` key bytes.
    /// 0 means unbounded.
    pub fn new(capacity: usize) -> Self {
        Self {
            list: IntrusiveList::new(),
            index: FxHashMap::default(),
            capacity,
            cost: 0,
        }
    }

    /// Number of keys tracked.
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Returns `true` if no keys are tracked.
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Sum of tracked key lengths in bytes.
    pub fn cost(&self) -> usize {
        self.cost
    }

    /// Returns `true` if `key` was recently recorded. This is the ghost
    /// hit check.
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Records `key` as most recently evicted, trimming the least recent
    /// keys while over budget. Re-recording promotes to the front.
    pub fn record(&mut self, key: &str) {
        if let Some(&id) = self.index.get(key) {
            self.list.move_to_front(id);
            return;
        }

        while self.capacity != 0 && self.cost + key.len() > self.capacity {
            if self.evict_oldest().is_none() {
                break;
            }
        }
        // Over-budget single key: nothing evictable remains, drop it.
        if self.capacity != 0 && self.cost + key.len() > self.capacity {
            return;
        }

        let id = self.list.push_front(key.to_owned());
        self.index.insert(key.to_owned(), id);
        self.cost += key.len();
    }

    /// Forgets `key`; returns `true` if it was tracked. Called after a
    /// ghost hit so the key is not counted twice.
    pub fn remove(&mut self, key: &str) -> bool {
        match self.index.remove(key) {
            Some(id) => {
                if self.list.remove(id).is_some() {
                    self.cost -= key.len();
                }
                true
            }
            None => false,
        }
    }

    /// Drops the least recently recorded key and returns it.
    pub fn evict_oldest(&mut self) -> Option<String> {
        let key = self.list.pop_back()?;
        self.index.remove(&key);
        self.cost -= key.len();
        Some(key)
    }

    /// Forgets every key.
    pub fn clear(&mut self) {
        self.list.clear();
        self.index.clear();
        self.cost = 0;
    }
}
