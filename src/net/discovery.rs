//! Service discovery seam.
//!
//! The fleet coordinates membership through a shared registry. This module
//! fixes the interface the cache needs from it and nothing more:
//! [`Discovery::register`] announces a node and keeps its lease alive
//! until a stop signal fires, and [`Discovery::dial`] turns a service name
//! into a live connection. Service names have the form `cache/<addr>`.
//!
//! A registry-backed implementation (etcd on its usual `localhost:2379`
//! development endpoint, Consul, and friends) lives with the application;
//! [`DirectDiscovery`] is the development resolver that reads the peer
//! address straight out of the service name and dials it.

use std::net::{TcpStream, ToSocketAddrs};
use std::sync::mpsc::Receiver;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::CacheError;

/// Builds the canonical service name for a peer address.
pub fn service_name(addr: &str) -> String {
    format!("cache/{addr}")
}

/// Registry operations the cache fleet depends on.
pub trait Discovery: Send + Sync {
    /// Announces `addr` under `service` and blocks, keeping the
    /// registration alive, until `stop` fires. Returning without an error
    /// means the registration was cleanly revoked.
    fn register(&self, service: &str, addr: &str, stop: Receiver<()>) -> Result<(), CacheError>;

    /// Resolves `service` (a `cache/<addr>` name) and opens a connection
    /// to it.
    fn dial(&self, service: &str) -> Result<TcpStream, CacheError>;
}

/// Resolver for fleets whose service names embed the peer address.
///
/// No external registry is consulted: `register` simply parks on the stop
/// channel, and `dial` connects to the address encoded in the name.
pub struct DirectDiscovery {
    dial_timeout: Duration,
}

impl DirectDiscovery {
    /// Creates a resolver with the given connect timeout.
    pub fn new(dial_timeout: Duration) -> Self {
        Self { dial_timeout }
    }
}

impl Default for DirectDiscovery {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl Discovery for DirectDiscovery {
    fn register(&self, service: &str, addr: &str, stop: Receiver<()>) -> Result<(), CacheError> {
        info!(service, addr, "service registered");
        // Block until stop fires; a dropped sender counts as a stop.
        let _ = stop.recv();
        info!(service, addr, "service revoked");
        Ok(())
    }

    fn dial(&self, service: &str) -> Result<TcpStream, CacheError> {
        let addr = service
            .strip_prefix("cache/")
            .ok_or_else(|| CacheError::Discovery(format!("unknown service '{service}'")))?;
        let socket_addr = addr
            .to_socket_addrs()
            .map_err(CacheError::discovery)?
            .next()
            .ok_or_else(|| CacheError::Discovery(format!("service '{service}' did not resolve")))?;
        debug!(service, %socket_addr, "dialing peer");
        TcpStream::connect_timeout(&socket_addr, self.dial_timeout).map_err(CacheError::transport)
    }
}
