//! Thread-safe façade over an eviction engine.
//!
//! Engine lookups mutate recency or frequency state, so there is no
//! shared-read fast path: both `get` and `add` take one exclusive
//! `parking_lot::Mutex` for the whole operation. Values come back as owned
//! clones; references cannot outlive the lock.
//!
//! Callers must not re-enter the wrapper from an eviction hook. The hook
//! runs while the engine mutex is held.

use parking_lot::Mutex;

use crate::policy::{ArcCache, CachePolicy, LfuCache, LruCache};
use crate::traits::{CacheEngine, Weighted};

/// Engine selected at construction time. Enum dispatch keeps the hot path
/// free of virtual calls.
enum Engine<V> {
    Lru(LruCache<V>),
    Lfu(LfuCache<V>),
    Arc(ArcCache<V>),
}

impl<V: Weighted> Engine<V> {
    fn as_dyn(&mut self) -> &mut dyn CacheEngine<V> {
        match self {
            Engine::Lru(engine) => engine,
            Engine::Lfu(engine) => engine,
            Engine::Arc(engine) => engine,
        }
    }

    fn len(&self) -> usize {
        match self {
            Engine::Lru(engine) => engine.len(),
            Engine::Lfu(engine) => engine.len(),
            Engine::Arc(engine) => engine.len(),
        }
    }

    fn current_cost(&self) -> usize {
        match self {
            Engine::Lru(engine) => engine.current_cost(),
            Engine::Lfu(engine) => engine.current_cost(),
            Engine::Arc(engine) => engine.current_cost(),
        }
    }
}

/// Mutex-guarded cache with a policy chosen by tag.
///
/// # Example
///
/// ```
/// use cachemesh::cache::ConcurrentCache;
/// use cachemesh::policy::CachePolicy;
/// use cachemesh::ByteView;
///
/// let cache = ConcurrentCache::new(0, CachePolicy::from_tag("lru"));
/// cache.add("k", ByteView::from("v"));
/// assert_eq!(cache.get("k"), Some(ByteView::from("v")));
/// ```
pub struct ConcurrentCache<V> {
    inner: Mutex<Engine<V>>,
}

impl<V: Weighted + Clone> ConcurrentCache<V> {
    /// Creates a cache with the given byte budget (0 is unbounded) and
    /// eviction policy.
    pub fn new(capacity: usize, policy: CachePolicy) -> Self {
        let engine = match policy {
            CachePolicy::Lru => Engine::Lru(LruCache::new(capacity)),
            CachePolicy::Lfu => Engine::Lfu(LfuCache::new(capacity)),
            CachePolicy::Arc => Engine::Arc(ArcCache::new(capacity)),
        };
        Self {
            inner: Mutex::new(engine),
        }
    }

    /// Looks up `key` under the engine mutex; returns an owned clone.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut engine = self.inner.lock();
        engine.as_dyn().get(key).cloned()
    }

    /// Inserts or updates `key` under the engine mutex.
    pub fn add(&self, key: &str, value: V) {
        let mut engine = self.inner.lock();
        engine.as_dyn().add(key, value);
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns `true` if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current byte cost of the live entries.
    pub fn current_cost(&self) -> usize {
        self.inner.lock().current_cost()
    }
}
