//! Data structures shared by the eviction engines and the peer router.

pub mod ghost_list;
pub mod hash_ring;
pub mod intrusive_list;
pub mod slot_arena;

pub use ghost_list::GhostList;
pub use hash_ring::{HashRing, RingHasher, DEFAULT_REPLICAS};
pub use intrusive_list::IntrusiveList;
pub use slot_arena::{SlotArena, SlotId};
