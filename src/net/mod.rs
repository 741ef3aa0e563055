//! Peer RPC: wire framing, discovery seam, client, and server.

pub mod client;
pub mod discovery;
pub mod server;
pub mod wire;

pub use client::{Client, DEFAULT_RPC_TIMEOUT};
pub use discovery::{service_name, DirectDiscovery, Discovery};
pub use server::{Server, DEFAULT_ADDR};

/// Checks `host:port` syntax: a non-empty hostname or dotted quad, then a
/// colon, then a non-zero port.
pub(crate) fn valid_peer_addr(addr: &str) -> bool {
    let Some((host, port)) = addr.rsplit_once(':') else {
        return false;
    };
    if host.is_empty() || port.parse::<u16>().map_or(true, |p| p == 0) {
        return false;
    }
    host.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_dotted_quads_and_hostnames() {
        assert!(valid_peer_addr("127.0.0.1:6324"));
        assert!(valid_peer_addr("cache-node-1:80"));
        assert!(valid_peer_addr("localhost:2379"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(!valid_peer_addr(""));
        assert!(!valid_peer_addr("127.0.0.1"));
        assert!(!valid_peer_addr(":6324"));
        assert!(!valid_peer_addr("host:"));
        assert!(!valid_peer_addr("host:0"));
        assert!(!valid_peer_addr("host:notaport"));
        assert!(!valid_peer_addr("host:99999"));
        assert!(!valid_peer_addr("ho st:80"));
    }
}
