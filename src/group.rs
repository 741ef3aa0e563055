//! Namespaced cache groups and the process-wide group registry.
//!
//! A [`Group`] ties together one bounded cache, one single-flight
//! coalescer, the application origin, and (optionally) a peer picker. Its
//! `get` path:
//!
//! 1. Reject the empty key.
//! 2. Serve from the local cache if present.
//! 3. Otherwise enter the coalescer keyed on the key. Inside the flight,
//!    ask the picker for the key's owner; a remote owner is fetched over
//!    RPC (and **not** cached here, the owner keeps the cached copy), a
//!    fetch failure or a local owner falls through to the origin, whose
//!    result is cached locally.
//!
//! The cache mutex is released before the flight begins and the loader
//! runs outside every lock, so cache access never blocks on origin or
//! network latency.
//!
//! Groups register in a process-wide table so the RPC server can dispatch
//! incoming gets by namespace. Lookups take a read lock; registration and
//! destruction take the write lock.

use std::sync::{Arc, LazyLock, OnceLock};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::byteview::ByteView;
use crate::cache::ConcurrentCache;
use crate::error::CacheError;
use crate::flight::Flight;
use crate::policy::CachePolicy;
use crate::traits::{PeerPicker, Retriever};

static GROUPS: LazyLock<RwLock<FxHashMap<String, Arc<Group>>>> =
    LazyLock::new(|| RwLock::new(FxHashMap::default()));

/// A named cache namespace.
pub struct Group {
    name: String,
    cache: ConcurrentCache<ByteView>,
    retriever: Box<dyn Retriever>,
    picker: OnceLock<Arc<dyn PeerPicker>>,
    flight: Flight<ByteView>,
}

/// Creates a group and registers it under `name`.
///
/// `capacity` is the cache byte budget (0 is unbounded); `strategy` is the
/// eviction tag (`"lru"`, `"lfu"`, `"arc"`; anything else selects LRU).
/// Fails with [`CacheError::GroupExists`] if the name is taken.
///
/// # Example
///
/// ```
/// use cachemesh::{new_group, CacheError};
///
/// let group = new_group("example-scores", 2 << 10, "lru", |key: &str| {
///     Err::<Vec<u8>, _>(CacheError::KeyNotFound(key.to_owned()))
/// })
/// .unwrap();
/// assert!(group.get("Tom").is_err());
/// # cachemesh::destroy_group("example-scores");
/// ```
pub fn new_group(
    name: &str,
    capacity: usize,
    strategy: &str,
    retriever: impl Retriever + 'static,
) -> Result<Arc<Group>, CacheError> {
    let group = Arc::new(Group {
        name: name.to_owned(),
        cache: ConcurrentCache::new(capacity, CachePolicy::from_tag(strategy)),
        retriever: Box::new(retriever),
        picker: OnceLock::new(),
        flight: Flight::new(),
    });

    let mut groups = GROUPS.write();
    if groups.contains_key(name) {
        return Err(CacheError::GroupExists(name.to_owned()));
    }
    groups.insert(name.to_owned(), group.clone());
    info!(group = name, capacity, strategy, "registered cache group");
    Ok(group)
}

/// Looks up a registered group by name.
pub fn get_group(name: &str) -> Option<Arc<Group>> {
    GROUPS.read().get(name).cloned()
}

/// Unregisters `name`, stopping its attached server if one is registered.
/// Unknown names are a no-op.
pub fn destroy_group(name: &str) {
    let group = GROUPS.write().remove(name);
    if let Some(group) = group {
        if let Some(picker) = group.picker.get() {
            picker.stop();
        }
        info!(group = name, "destroyed cache group");
    }
}

impl Group {
    /// The namespace this group serves.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attaches the peer picker. One-shot: a second call fails with
    /// [`CacheError::PickerAlreadyRegistered`].
    pub fn register_picker(&self, picker: Arc<dyn PeerPicker>) -> Result<(), CacheError> {
        self.picker
            .set(picker)
            .map_err(|_| CacheError::PickerAlreadyRegistered(self.name.clone()))
    }

    /// Returns the value for `key`, from cache, peer, or origin.
    pub fn get(&self, key: &str) -> Result<ByteView, CacheError> {
        if key.is_empty() {
            return Err(CacheError::EmptyKey);
        }
        if let Some(view) = self.cache.get(key) {
            debug!(group = %self.name, key, "cache hit");
            return Ok(view);
        }
        self.load(key)
    }

    /// Cache-miss path: coalesced peer fetch or origin load.
    fn load(&self, key: &str) -> Result<ByteView, CacheError> {
        self.flight.fly(key, || {
            if let Some(picker) = self.picker.get() {
                if let Some(fetcher) = picker.pick_peer(key) {
                    match fetcher.fetch(&self.name, key) {
                        // The owning node caches this value; holding a
                        // second copy here would just duplicate it.
                        Ok(bytes) => return Ok(ByteView::from(bytes)),
                        Err(err) => {
                            warn!(group = %self.name, key, %err, "peer fetch failed, falling back to origin");
                        }
                    }
                }
            }
            self.load_locally(key)
        })
    }

    /// Loads from the origin and populates the local cache.
    fn load_locally(&self, key: &str) -> Result<ByteView, CacheError> {
        let bytes = self.retriever.retrieve(key)?;
        let view = ByteView::from(bytes);
        self.cache.add(key, view.clone());
        Ok(view)
    }

    /// Number of locally cached entries.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

impl std::fmt::Debug for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("name", &self.name)
            .field("cached_len", &self.cache.len())
            .finish()
    }
}
