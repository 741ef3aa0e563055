//! Server side of the peer get RPC, plus consistent-hash peer picking.
//!
//! One [`Server`] runs per node. It plays two roles:
//!
//! - **RPC server**: accepts connections on its listen address and answers
//!   get requests by dispatching into the local group registry.
//! - **Peer picker**: owns the hash ring and the client table, and decides
//!   per key whether to serve locally or hand back a client for the
//!   owning peer.
//!
//! Ring, client table, and run status share one mutex with short critical
//! sections; no lock is held across network I/O. `set_peers` rebuilds
//! ring and clients wholesale, so membership changes publish atomically.

use std::net::{TcpListener, TcpStream, ToSocketAddrs};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, error, info, warn};

use crate::ds::hash_ring::{HashRing, DEFAULT_REPLICAS};
use crate::error::CacheError;
use crate::group::get_group;
use crate::net::client::Client;
use crate::net::discovery::{service_name, DirectDiscovery, Discovery};
use crate::net::wire::{read_frame, write_frame, GetRequest, GetResponse};
use crate::net::valid_peer_addr;
use crate::traits::{Fetcher, PeerPicker};

/// Listen address used when none is given.
pub const DEFAULT_ADDR: &str = "127.0.0.1:6324";

struct State {
    running: bool,
    stop_tx: Option<Sender<()>>,
    ring: HashRing,
    clients: FxHashMap<String, Arc<Client>>,
}

/// Peer-facing RPC server and key router for one cache node.
pub struct Server {
    addr: String,
    discovery: Arc<dyn Discovery>,
    state: Mutex<State>,
}

impl Server {
    /// Creates a stopped server on `addr` (empty selects
    /// [`DEFAULT_ADDR`]), resolving peers through [`DirectDiscovery`].
    pub fn new(addr: &str) -> Result<Arc<Self>, CacheError> {
        Self::with_discovery(addr, Arc::new(DirectDiscovery::default()))
    }

    /// Creates a stopped server with a caller-supplied discovery registry.
    pub fn with_discovery(
        addr: &str,
        discovery: Arc<dyn Discovery>,
    ) -> Result<Arc<Self>, CacheError> {
        let addr = if addr.is_empty() { DEFAULT_ADDR } else { addr };
        if !valid_peer_addr(addr) {
            return Err(CacheError::InvalidAddr(addr.to_owned()));
        }
        Ok(Arc::new(Self {
            addr: addr.to_owned(),
            discovery,
            state: Mutex::new(State {
                running: false,
                stop_tx: None,
                ring: HashRing::new(DEFAULT_REPLICAS, None),
                clients: FxHashMap::default(),
            }),
        }))
    }

    /// The address this server answers on.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Returns `true` while the accept loop is live.
    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    /// Replaces the ring and client table with `peers`. This overwrites:
    /// previous membership is discarded. Every address is validated before
    /// anything is replaced, so a bad list leaves the old state intact.
    pub fn set_peers<I, S>(&self, peers: I) -> Result<(), CacheError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let peers: Vec<String> = peers.into_iter().map(Into::into).collect();
        for peer in &peers {
            if !valid_peer_addr(peer) {
                return Err(CacheError::InvalidAddr(peer.clone()));
            }
        }

        let mut ring = HashRing::new(DEFAULT_REPLICAS, None);
        ring.register(peers.iter().cloned());
        let clients = peers
            .iter()
            .map(|peer| {
                let client = Client::new(service_name(peer), self.discovery.clone());
                (peer.clone(), Arc::new(client))
            })
            .collect();

        let mut state = self.state.lock();
        state.ring = ring;
        state.clients = clients;
        info!(addr = %self.addr, peers = peers.len(), "peer set replaced");
        Ok(())
    }

    /// Starts serving. Blocks until [`shutdown`](Self::shutdown) is
    /// called; run it on its own thread. Fails with
    /// [`CacheError::ServerAlreadyStarted`]
    /// if the server is live, or with a transport error if the listen
    /// address cannot be bound.
    pub fn start(self: &Arc<Self>) -> Result<(), CacheError> {
        let stop_rx = {
            let mut state = self.state.lock();
            if state.running {
                return Err(CacheError::ServerAlreadyStarted);
            }
            state.running = true;
            let (stop_tx, stop_rx) = mpsc::channel();
            state.stop_tx = Some(stop_tx);
            stop_rx
        };

        let listener = match TcpListener::bind(&self.addr) {
            Ok(listener) => listener,
            Err(err) => {
                let mut state = self.state.lock();
                state.running = false;
                state.stop_tx = None;
                return Err(CacheError::transport(err));
            }
        };
        info!(addr = %self.addr, "cache server listening");

        // Announce this node; the registration thread keeps the lease
        // alive until the stop signal fires. Losing the registration makes
        // this node unreachable, so it takes the server down with it.
        {
            let server = self.clone();
            thread::spawn(move || {
                if let Err(err) = server.discovery.register("cache", &server.addr, stop_rx) {
                    error!(addr = %server.addr, %err, "discovery registration failed");
                    server.shutdown();
                }
            });
        }

        for stream in listener.incoming() {
            if !self.is_running() {
                break;
            }
            match stream {
                Ok(stream) => {
                    let server = self.clone();
                    thread::spawn(move || server.handle_conn(stream));
                }
                Err(err) => {
                    warn!(addr = %self.addr, %err, "accept failed");
                }
            }
        }
        info!(addr = %self.addr, "cache server stopped");
        Ok(())
    }

    /// Serves one connection: a loop of request frame in, response frame
    /// out, until the peer hangs up.
    fn handle_conn(&self, mut stream: TcpStream) {
        loop {
            let request: GetRequest = match read_frame(&mut stream) {
                Ok(request) => request,
                // EOF or a broken frame; either way the conversation ends.
                Err(_) => return,
            };
            debug!(
                addr = %self.addr,
                namespace = %request.namespace,
                key = %request.key,
                "rpc get"
            );
            let response = self.handle_get(&request);
            if write_frame(&mut stream, &response).is_err() {
                return;
            }
        }
    }

    fn handle_get(&self, request: &GetRequest) -> GetResponse {
        if request.key.is_empty() {
            return GetResponse::error(CacheError::EmptyKey.to_string());
        }
        let Some(group) = get_group(&request.namespace) else {
            return GetResponse::error(
                CacheError::GroupNotFound(request.namespace.clone()).to_string(),
            );
        };
        match group.get(&request.key) {
            Ok(view) => GetResponse::value(view.to_vec()),
            Err(err) => GetResponse::error(err.to_string()),
        }
    }

    /// Stops serving and revokes the discovery registration. A no-op when
    /// the server is not running.
    pub fn shutdown(&self) {
        {
            let mut state = self.state.lock();
            if !state.running {
                return;
            }
            state.running = false;
            if let Some(stop_tx) = state.stop_tx.take() {
                let _ = stop_tx.send(());
            }
            state.clients.clear();
            state.ring = HashRing::new(DEFAULT_REPLICAS, None);
        }
        // The accept loop is parked in accept(); poke it so it observes
        // the stopped flag and exits.
        if let Ok(mut addrs) = self.addr.to_socket_addrs() {
            if let Some(addr) = addrs.next() {
                let _ = TcpStream::connect_timeout(&addr, Duration::from_millis(200));
            }
        }
    }
}

impl PeerPicker for Server {
    /// Routes `key` through the ring. `None` means the key is ours.
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn Fetcher>> {
        let state = self.state.lock();
        let owner = state.ring.get_peer(key)?;
        if owner == self.addr {
            debug!(addr = %self.addr, key, "key is owned locally");
            return None;
        }
        debug!(addr = %self.addr, key, owner, "picked remote peer");
        state
            .clients
            .get(owner)
            .cloned()
            .map(|client| client as Arc<dyn Fetcher>)
    }

    fn stop(&self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Server")
            .field("addr", &self.addr)
            .field("running", &state.running)
            .field("peers", &state.clients.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_addr_selects_the_default() {
        let server = Server::new("").unwrap();
        assert_eq!(server.addr(), DEFAULT_ADDR);
        assert!(!server.is_running());
    }

    #[test]
    fn malformed_addr_is_rejected() {
        assert_eq!(
            Server::new("nonsense").unwrap_err(),
            CacheError::InvalidAddr("nonsense".into())
        );
    }

    #[test]
    fn set_peers_validates_every_address() {
        let server = Server::new("127.0.0.1:6324").unwrap();
        let err = server
            .set_peers(["127.0.0.1:6324", "bogus"])
            .unwrap_err();
        assert_eq!(err, CacheError::InvalidAddr("bogus".into()));
        // Nothing was replaced; the ring is still empty.
        assert!(server.pick_peer("key").is_none());
    }

    #[test]
    fn pick_peer_returns_none_for_self() {
        let server = Server::new("127.0.0.1:6324").unwrap();
        server.set_peers(["127.0.0.1:6324"]).unwrap();
        // Single-node ring: every key is local.
        for key in ["a", "b", "Tom"] {
            assert!(server.pick_peer(key).is_none());
        }
    }

    #[test]
    fn pick_peer_routes_to_remote_owners() {
        let server = Server::new("127.0.0.1:6324").unwrap();
        server
            .set_peers(["127.0.0.1:6324", "127.0.0.1:6325", "127.0.0.1:6326"])
            .unwrap();

        // With three peers some keys must hash away from this node.
        let mut saw_remote = false;
        for i in 0..64 {
            if server.pick_peer(&format!("key{i}")).is_some() {
                saw_remote = true;
                break;
            }
        }
        assert!(saw_remote, "no key routed to a remote peer");
    }

    #[test]
    fn shutdown_before_start_is_a_noop() {
        let server = Server::new("127.0.0.1:6327").unwrap();
        server.shutdown();
        assert!(!server.is_running());
    }
}
