//! Single-flight request coalescing.
//!
//! A cache miss under concurrency is a stampede: every caller races to the
//! origin for the same key. [`Flight`] collapses the race by keeping at
//! most one load in the air per key. The first caller becomes the pilot
//! and runs the loader; everyone who arrives while the flight is up waits
//! on its latch and receives the same outcome. Once the pilot lands and
//! removes the flight, a later caller starts a fresh one.
//!
//! ```text
//!   caller A ──► no flight for "k": create packet, run loader ──► result
//!   caller B ──► flight exists: wait on latch ────────────────► same result
//!   caller C ──► flight exists: wait on latch ────────────────► same result
//!               (loader ran exactly once)
//! ```
//!
//! The flight table mutex is held only around map mutations, never across
//! the loader. Waiter cancellation is not supported: a loader always runs
//! to completion for its cohort.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;

use crate::error::CacheError;

/// One in-flight load: a one-shot latch plus the shared outcome slot.
struct Packet<V> {
    slot: Mutex<Option<Result<V, CacheError>>>,
    landed: Condvar,
}

impl<V: Clone> Packet<V> {
    fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            landed: Condvar::new(),
        }
    }

    /// Blocks until the pilot publishes the outcome, then returns a copy.
    fn wait(&self) -> Result<V, CacheError> {
        let mut slot = self.slot.lock();
        while slot.is_none() {
            self.landed.wait(&mut slot);
        }
        slot.as_ref().cloned().unwrap()
    }

    /// Publishes the outcome and releases every waiter. Called once.
    fn complete(&self, outcome: Result<V, CacheError>) {
        let mut slot = self.slot.lock();
        *slot = Some(outcome);
        self.landed.notify_all();
    }
}

/// Per-key load coalescer.
///
/// # Example
///
/// ```
/// use cachemesh::flight::Flight;
///
/// let flight: Flight<String> = Flight::new();
/// let value = flight.fly("k", || Ok("loaded".to_owned())).unwrap();
/// assert_eq!(value, "loaded");
/// ```
pub struct Flight<V> {
    flights: Mutex<FxHashMap<String, Arc<Packet<V>>>>,
}

impl<V: Clone> Flight<V> {
    /// Creates an empty coalescer.
    pub fn new() -> Self {
        Self {
            flights: Mutex::new(FxHashMap::default()),
        }
    }

    /// Runs `loader` for `key`, unless a flight for `key` is already up,
    /// in which case the call blocks and returns that flight's outcome.
    ///
    /// The loader runs outside every lock and is invoked by exactly one
    /// caller per cohort.
    pub fn fly<F>(&self, key: &str, loader: F) -> Result<V, CacheError>
    where
        F: FnOnce() -> Result<V, CacheError>,
    {
        let packet = {
            let mut flights = self.flights.lock();
            if let Some(packet) = flights.get(key) {
                let packet = packet.clone();
                drop(flights);
                return packet.wait();
            }
            let packet = Arc::new(Packet::new());
            flights.insert(key.to_owned(), packet.clone());
            packet
        };

        let outcome = loader();
        packet.complete(outcome.clone());

        self.flights.lock().remove(key);
        outcome
    }

    /// Number of flights currently in the air.
    pub fn in_flight(&self) -> usize {
        self.flights.lock().len()
    }
}

impl<V: Clone> Default for Flight<V> {
    fn default() -> Self {
        Self::new()
    }
}
