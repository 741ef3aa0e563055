//! Framing for the peer get RPC.
//!
//! A frame is a 4-byte big-endian length followed by a JSON body. One
//! request frame travels peer-to-peer, one response frame comes back.
//! Application-level failures (empty key, unknown group) ride inside the
//! response's `error` field with a human-readable message; anything that
//! breaks the frame itself (I/O, oversize, malformed JSON) is a transport
//! error.

use std::io::{Read, Write};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// Upper bound for a single frame body. Guards the reader against a
/// corrupt or hostile length prefix.
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// A remote get: which namespace, which key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetRequest {
    pub namespace: String,
    pub key: String,
}

/// The answer to a [`GetRequest`]. Exactly one field is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GetResponse {
    /// A successful response carrying `bytes`.
    pub fn value(bytes: Vec<u8>) -> Self {
        Self {
            value: Some(bytes),
            error: None,
        }
    }

    /// An application-level failure with a readable message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            value: None,
            error: Some(message.into()),
        }
    }
}

/// Serializes `msg` as one length-prefixed frame.
pub fn write_frame<T: Serialize>(writer: &mut impl Write, msg: &T) -> Result<(), CacheError> {
    let body = serde_json::to_vec(msg).map_err(CacheError::transport)?;
    if body.len() > MAX_FRAME_BYTES {
        return Err(CacheError::Transport(format!(
            "frame of {} bytes exceeds the {} byte limit",
            body.len(),
            MAX_FRAME_BYTES
        )));
    }
    writer
        .write_all(&(body.len() as u32).to_be_bytes())
        .map_err(CacheError::transport)?;
    writer.write_all(&body).map_err(CacheError::transport)?;
    writer.flush().map_err(CacheError::transport)
}

/// Reads one length-prefixed frame and deserializes it.
pub fn read_frame<T: DeserializeOwned>(reader: &mut impl Read) -> Result<T, CacheError> {
    let mut len_bytes = [0u8; 4];
    reader
        .read_exact(&mut len_bytes)
        .map_err(CacheError::transport)?;
    let len = u32::from_be_bytes(len_bytes) as usize;
    if len > MAX_FRAME_BYTES {
        return Err(CacheError::Transport(format!(
            "frame of {len} bytes exceeds the {MAX_FRAME_BYTES} byte limit"
        )));
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).map_err(CacheError::transport)?;
    serde_json::from_slice(&body).map_err(CacheError::transport)
}
