//! types.rs
//! Unified transfer error and the integrity failures it carries.
//! `From<T>` impls let `?` cross codec, transport, staging and registry layers.

use std::io;

use thiserror::Error;

use crate::codec::CodecError;
use crate::transfer::registry::ConcurrencyMisuseError;
use crate::transfer::staging::StagingError;
use crate::transfer::transport::TransportError;
use crate::worker::TaskError;

/// Reassembly produced something other than the expected payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("reassembled {actual} bytes, expected {expected}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("chunk {index} arrived after the write cursor passed it (next = {next})")]
    OutOfOrder { index: u64, next: u64 },

    #[error("chunk {index} delivered twice")]
    Duplicate { index: u64 },

    #[error("chunk {index} is missing from staging")]
    MissingChunk { index: u64 },

    #[error("reassembly stopped at chunk {next} with {pending} chunks still pending")]
    Incomplete { next: u64, pending: usize },
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("staging error: {0}")]
    Staging(#[from] StagingError),

    #[error("concurrency misuse: {0}")]
    Misuse(#[from] ConcurrencyMisuseError),

    #[error("integrity error: {0}")]
    Integrity(#[from] IntegrityError),

    /// A worker task failed; tagged with the chunk it was working on.
    #[error("chunk {index} failed: {source}")]
    Chunk { index: u64, source: TaskError },

    #[error("transfer of {path} was cancelled")]
    Cancelled { path: String },

    #[error("worker pool disconnected")]
    WorkerDisconnected,

    #[error("invalid transfer config: {0}")]
    Config(String),
}

impl TransferError {
    /// Index of the failing chunk, when the failure came from a worker.
    pub fn chunk_index(&self) -> Option<u64> {
        match self {
            TransferError::Chunk { index, .. } => Some(*index),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransferError::Cancelled { .. })
    }
}
