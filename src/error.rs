//! Error types for the cachemesh library.
//!
//! All fallible operations return [`CacheError`]. The enum is deliberately
//! `Clone`: a single-flight loader produces one outcome that must be handed
//! to every coalesced waiter, so variants carry owned strings rather than
//! non-cloneable sources like `std::io::Error`.

use thiserror::Error;

/// Unified error for cache, group, and peer operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// An empty key was passed to a group or RPC get.
    #[error("key required")]
    EmptyKey,

    /// A peer address did not match `host:port` with a numeric port.
    #[error("invalid peer address '{0}', expected host:port")]
    InvalidAddr(String),

    /// No group is registered under the requested namespace.
    #[error("group '{0}' not found")]
    GroupNotFound(String),

    /// A group with this name is already registered.
    #[error("group '{0}' already registered")]
    GroupExists(String),

    /// `register_picker` was called twice on the same group.
    #[error("picker already registered for group '{0}'")]
    PickerAlreadyRegistered(String),

    /// `start` was called on a server that is already running.
    #[error("server already started")]
    ServerAlreadyStarted,

    /// The origin has no value for this key.
    #[error("key '{0}' not found")]
    KeyNotFound(String),

    /// Dial, read, write, framing, or decode failure on the peer transport.
    #[error("transport error: {0}")]
    Transport(String),

    /// The discovery registry could not resolve or reach a service.
    #[error("discovery error: {0}")]
    Discovery(String),

    /// A remote get failed end to end.
    #[error("could not get '{namespace}/{key}' from peer '{service}': {detail}")]
    PeerFetch {
        namespace: String,
        key: String,
        service: String,
        detail: String,
    },

    /// An application-supplied origin failed with its own message.
    #[error("{0}")]
    Origin(String),
}

impl CacheError {
    /// Wraps an I/O error as a transport failure.
    pub(crate) fn transport(err: impl std::fmt::Display) -> Self {
        CacheError::Transport(err.to_string())
    }

    /// Wraps a resolver failure as a discovery error.
    pub(crate) fn discovery(err: impl std::fmt::Display) -> Self {
        CacheError::Discovery(err.to_string())
    }
}
