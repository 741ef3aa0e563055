//! cachemesh: a distributed, namespaced, in-memory key-value cache.
//!
//! Nodes form a fleet that partitions one keyspace by consistent hashing.
//! Each node serves its share from a bounded local cache (LRU, LFU, or
//! ARC), forwards foreign keys to their owner over a get RPC, fills misses
//! from an application origin, and collapses concurrent loads per key with
//! a single-flight coalescer.
//!
//! ```no_run
//! use cachemesh::{new_group, CacheError, Server};
//!
//! let group = new_group("scores", 2 << 10, "lru", |key: &str| {
//!     // Application origin: hit the real data source.
//!     Err::<Vec<u8>, _>(CacheError::KeyNotFound(key.to_owned()))
//! })?;
//!
//! let server = Server::new("127.0.0.1:6324")?;
//! server.set_peers(["127.0.0.1:6324", "127.0.0.1:6325"])?;
//! group.register_picker(server.clone())?;
//!
//! std::thread::spawn(move || server.start());
//! let _value = group.get("Tom");
//! # Ok::<(), CacheError>(())
//! ```

pub mod byteview;
pub mod cache;
pub mod ds;
pub mod error;
pub mod flight;
pub mod group;
pub mod net;
pub mod policy;
pub mod traits;

pub use byteview::ByteView;
pub use error::CacheError;
pub use group::{destroy_group, get_group, new_group, Group};
pub use net::{Client, DirectDiscovery, Discovery, Server};
pub use policy::CachePolicy;
pub use traits::{CacheEngine, Fetcher, PeerPicker, Retriever, Weighted};
