//! Consistent hash ring with virtual nodes.
//!
//! Each physical peer occupies `replicas` positions on a 32-bit ring; a
//! position is the hash of the replica index concatenated with the peer
//! address. A key is owned by the peer at the first position clockwise
//! from the key's own hash, wrapping past the top of the ring. More
//! replicas smooth the key distribution across peers.
//!
//! The ring is append-only: `register` adds peers and re-sorts. Callers
//! that reconfigure membership build a fresh ring and swap it in whole.
//!
//! ## Example
//!
//! ```
//! use cachemesh::ds::HashRing;
//!
//! let mut ring = HashRing::new(50, None);
//! ring.register(["10.0.0.1:6324", "10.0.0.2:6324", "10.0.0.3:6324"]);
//!
//! let owner = ring.get_peer("alpha").unwrap();
//! // Same key, same owner, every time.
//! assert_eq!(ring.get_peer("alpha"), Some(owner));
//! ```

use rustc_hash::FxHashMap;

/// Hash function mapping arbitrary bytes onto the 32-bit ring.
pub type RingHasher = fn(&[u8]) -> u32;

/// Default virtual-node multiplier per peer.
pub const DEFAULT_REPLICAS: usize = 50;

fn crc32_hasher(bytes: &[u8]) -> u32 {
    crc32c::crc32c(bytes)
}

/// Key-to-peer router over a consistent hash ring.
pub struct HashRing {
    replicas: usize,
    hasher: RingHasher,
    /// Sorted virtual-node positions.
    positions: Vec<u32>,
    /// Position -> peer address. On a position collision the later
    /// registered peer wins.
    owners: FxHashMap<u32, String>,
}

impl HashRing {
    /// Creates an empty ring. `replicas == 0` falls back to the default
    /// multiplier; `hasher` defaults to a CRC-32 checksum.
    pub fn new(replicas: usize, hasher: Option<RingHasher>) -> Self {
        Self {
            replicas: if replicas == 0 {
                DEFAULT_REPLICAS
            } else {
                replicas
            },
            hasher: hasher.unwrap_or(crc32_hasher),
            positions: Vec::new(),
            owners: FxHashMap::default(),
        }
    }

    /// Adds peers to the ring, placing `replicas` virtual nodes for each.
    pub fn register<I, S>(&mut self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for peer in peers {
            let peer = peer.into();
            for replica in 0..self.replicas {
                let position = (self.hasher)(format!("{replica}{peer}").as_bytes());
                self.positions.push(position);
                self.owners.insert(position, peer.clone());
            }
        }
        self.positions.sort_unstable();
    }

    /// Returns the address of the peer owning `key`, or `None` when the
    /// ring is empty.
    pub fn get_peer(&self, key: &str) -> Option<&str> {
        if self.positions.is_empty() {
            return None;
        }
        let hash = (self.hasher)(key.as_bytes());
        // First virtual node at or after the key's hash, wrapping to the
        // start of the ring.
        let idx = self.positions.partition_point(|&position| position < hash);
        let position = if idx == self.positions.len() {
            self.positions[0]
        } else {
            self.positions[idx]
        };
        self.owners.get(&position).map(String::as_str)
    }

    /// Returns `true` if no peers are registered.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Number of virtual nodes on the ring.
    pub fn virtual_len(&self) -> usize {
        self.positions.len()
    }
}

impl std::fmt::Debug for HashRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashRing")
            .field("replicas", &self.replicas)
            .field("virtual_len", &self.positions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Decimal-parse hasher: makes ring positions readable in tests.
    fn digit_hasher(bytes: &[u8]) -> u32 {
        std::str::from_utf8(bytes)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    }

    #[test]
    fn empty_ring_has_no_owner() {
        let ring = HashRing::new(3, None);
        assert!(ring.is_empty());
        assert_eq!(ring.get_peer("anything"), None);
    }

    #[test]
    fn keys_map_to_the_next_clockwise_node() {
        // Peers "2", "4", "6" with replicas=3 produce virtual nodes
        // 02/12/22, 04/14/24, 06/16/26.
        let mut ring = HashRing::new(3, Some(digit_hasher));
        ring.register(["6", "4", "2"]);

        assert_eq!(ring.get_peer("2"), Some("2"));
        assert_eq!(ring.get_peer("11"), Some("2")); // 11 -> 12
        assert_eq!(ring.get_peer("23"), Some("4")); // 23 -> 24
        assert_eq!(ring.get_peer("27"), Some("2")); // wraps to 02
    }

    #[test]
    fn register_extends_the_ring() {
        let mut ring = HashRing::new(3, Some(digit_hasher));
        ring.register(["2", "4", "6"]);
        assert_eq!(ring.get_peer("27"), Some("2"));

        // Peer "8" adds nodes 08/18/28; 27 now lands on 28.
        ring.register(["8"]);
        assert_eq!(ring.get_peer("27"), Some("8"));
        assert_eq!(ring.virtual_len(), 12);
    }

    #[test]
    fn lookups_are_deterministic() {
        let mut ring = HashRing::new(DEFAULT_REPLICAS, None);
        ring.register(["peer-a:6324", "peer-b:6324", "peer-c:6324"]);

        let alpha = ring.get_peer("alpha").unwrap().to_owned();
        let beta = ring.get_peer("beta").unwrap().to_owned();
        for _ in 0..16 {
            assert_eq!(ring.get_peer("alpha"), Some(alpha.as_str()));
            assert_eq!(ring.get_peer("beta"), Some(beta.as_str()));
        }

        // A ring built the same way resolves the same owners.
        let mut again = HashRing::new(DEFAULT_REPLICAS, None);
        again.register(["peer-a:6324", "peer-b:6324", "peer-c:6324"]);
        assert_eq!(again.get_peer("alpha"), Some(alpha.as_str()));
        assert_eq!(again.get_peer("beta"), Some(beta.as_str()));
    }

    #[test]
    fn keys_in_the_same_arc_share_an_owner() {
        let mut ring = HashRing::new(3, Some(digit_hasher));
        ring.register(["10", "20"]);
        // Both hash between node 110 and node 120 boundaries.
        assert_eq!(ring.get_peer("111"), ring.get_peer("115"));
    }

    #[test]
    fn zero_replicas_uses_default() {
        let mut ring = HashRing::new(0, None);
        ring.register(["only:1"]);
        assert_eq!(ring.virtual_len(), DEFAULT_REPLICAS);
        assert_eq!(ring.get_peer("k"), Some("only:1"));
    }

    #[test]
    fn every_key_resolves_with_a_single_peer() {
        let mut ring = HashRing::new(DEFAULT_REPLICAS, None);
        ring.register(["solo:9"]);
        for key in ["a", "b", "c", "alpha", "beta", "gamma"] {
            assert_eq!(ring.get_peer(key), Some("solo:9"));
        }
    }
}
