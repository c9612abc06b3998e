//! transfer/transport.rs
//! What the coordinator needs from the wire.
//!
//! Implementations are shared across worker threads (`put_chunk` runs inside
//! a worker right after obfuscation), so they must be `Send + Sync`.

use bytes::Bytes;
use thiserror::Error;

use crate::chain::ObfuscationConfig;
use crate::transfer::chunk::ByteRange;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request for {path} failed: {reason}")]
    Request { path: String, reason: String },

    #[error("{path} not found")]
    NotFound { path: String },

    #[error("no transfer registered for {path}")]
    UnknownTransfer { path: String },

    #[error("transfer for {path} already exists")]
    AlreadyExists { path: String },

    #[error("range {range} outside {path} ({size} bytes)")]
    RangeOutOfBounds { path: String, range: ByteRange, size: u64 },

    #[error("server rejected chunk for {path}: {reason}")]
    Rejected { path: String, reason: String },
}

impl TransportError {
    pub fn request(path: &str, reason: impl Into<String>) -> Self {
        TransportError::Request { path: path.to_string(), reason: reason.into() }
    }
}

pub trait Transport: Send + Sync {
    /// Announce an upload and the config its chunks are obfuscated with.
    fn begin_transfer(&self, _path: &str, _config: &ObfuscationConfig) -> Result<(), TransportError> {
        Ok(())
    }

    /// Obfuscated bytes for `range` of the stored payload.
    fn fetch_chunk(&self, path: &str, range: ByteRange) -> Result<Bytes, TransportError>;

    /// Obfuscated bytes for `range` of the payload being uploaded.
    fn put_chunk(&self, path: &str, range: ByteRange, data: Bytes) -> Result<(), TransportError>;

    /// Roll back a partial upload.
    fn cancel_transfer(&self, path: &str) -> Result<(), TransportError>;

    /// Commit a completed upload.
    fn finish_transfer(&self, path: &str) -> Result<(), TransportError>;
}
