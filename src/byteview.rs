//! Immutable byte value shared between cache, coalescer, and transport.
//!
//! A [`ByteView`] wraps its payload in `Arc<[u8]>`: cloning is a reference
//! count bump, and since no API hands out `&mut [u8]`, a view handed to a
//! caller can never mutate cached state. Ingress copies (`from_slice`,
//! `From<&str>`) and egress copies (`to_vec`) happen at the group boundary.

use std::fmt;
use std::sync::Arc;

use crate::traits::Weighted;

/// An immutable, cheaply cloneable byte sequence.
///
/// # Example
///
/// ```
/// use cachemesh::ByteView;
///
/// let view = ByteView::from("630");
/// assert_eq!(view.len(), 3);
/// assert_eq!(view.as_slice(), b"630");
/// assert_eq!(view.to_string(), "630");
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ByteView {
    bytes: Arc<[u8]>,
}

impl ByteView {
    /// Copies `bytes` into a new view.
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self {
            bytes: Arc::from(bytes),
        }
    }

    /// Returns the payload length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if the view holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Borrows the payload. The slice is immutable for the view's lifetime.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Copies the payload out into an owned vector.
    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }
}

impl From<Vec<u8>> for ByteView {
    fn from(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Arc::from(bytes),
        }
    }
}

impl From<&[u8]> for ByteView {
    fn from(bytes: &[u8]) -> Self {
        Self::from_slice(bytes)
    }
}

impl From<&str> for ByteView {
    fn from(text: &str) -> Self {
        Self::from_slice(text.as_bytes())
    }
}

impl Weighted for ByteView {
    fn weight(&self) -> usize {
        self.len()
    }
}

impl fmt::Display for ByteView {
    /// Renders the payload as lossy UTF-8.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.bytes))
    }
}

impl fmt::Debug for ByteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteView({} bytes)", self.len())
    }
}
