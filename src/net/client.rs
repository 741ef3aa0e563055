//! Client side of the peer get RPC.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::error::CacheError;
use crate::net::discovery::Discovery;
use crate::net::wire::{read_frame, write_frame, GetRequest, GetResponse};
use crate::traits::Fetcher;

/// Deadline applied to each remote get.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches cache values from one remote peer, resolved through discovery
/// on every call so the peer can move.
pub struct Client {
    /// Service name of the peer, `cache/<addr>`.
    service: String,
    discovery: Arc<dyn Discovery>,
    timeout: Duration,
}

impl Client {
    /// Creates a client for `service`.
    pub fn new(service: impl Into<String>, discovery: Arc<dyn Discovery>) -> Self {
        Self {
            service: service.into(),
            discovery,
            timeout: DEFAULT_RPC_TIMEOUT,
        }
    }

    /// Overrides the per-call deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn wrap_err(&self, namespace: &str, key: &str, err: CacheError) -> CacheError {
        CacheError::PeerFetch {
            namespace: namespace.to_owned(),
            key: key.to_owned(),
            service: self.service.clone(),
            detail: err.to_string(),
        }
    }
}

impl Fetcher for Client {
    fn fetch(&self, namespace: &str, key: &str) -> Result<Vec<u8>, CacheError> {
        let mut stream = self
            .discovery
            .dial(&self.service)
            .map_err(|err| self.wrap_err(namespace, key, err))?;
        stream
            .set_read_timeout(Some(self.timeout))
            .and_then(|_| stream.set_write_timeout(Some(self.timeout)))
            .map_err(|err| self.wrap_err(namespace, key, CacheError::transport(err)))?;

        debug!(service = %self.service, namespace, key, "remote get");
        let request = GetRequest {
            namespace: namespace.to_owned(),
            key: key.to_owned(),
        };
        write_frame(&mut stream, &request)
            .map_err(|err| self.wrap_err(namespace, key, err))?;
        let response: GetResponse =
            read_frame(&mut stream).map_err(|err| self.wrap_err(namespace, key, err))?;

        if let Some(message) = response.error {
            return Err(self.wrap_err(namespace, key, CacheError::Transport(message)));
        }
        response
            .value
            .ok_or_else(|| self.wrap_err(namespace, key, CacheError::Transport("empty response".into())))
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("service", &self.service)
            .field("timeout", &self.timeout)
            .finish()
    }
}
