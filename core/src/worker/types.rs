//! worker/types.rs
//! Units of work handed to the pool and the tagged results it returns.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;

use crate::chain::ObfuscationConfig;
use crate::codec::{CodecError, Direction};
use crate::telemetry::StageTimes;
use crate::transfer::chunk::{ByteRange, Chunk};
use crate::transfer::transport::TransportError;
use crate::types::TransferError;

/// Runs on the worker thread with the transformed bytes, before the outcome
/// is reported. Upload uses it to put the chunk on the wire.
pub type Completion = Box<dyn FnOnce(&Chunk, Bytes) -> Result<(), TransportError> + Send>;

pub struct WorkerTask {
    pub chunk: Chunk,
    pub config: Arc<ObfuscationConfig>,
    pub direction: Direction,
    pub on_complete: Option<Completion>,
}

impl WorkerTask {
    pub fn new(chunk: Chunk, config: Arc<ObfuscationConfig>, direction: Direction) -> Self {
        Self { chunk, config, direction, on_complete: None }
    }

    pub fn with_completion(
        mut self,
        f: impl FnOnce(&Chunk, Bytes) -> Result<(), TransportError> + Send + 'static,
    ) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for WorkerTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerTask")
            .field("index", &self.chunk.index)
            .field("range", &self.chunk.range)
            .field("direction", &self.direction)
            .field("steps", &self.config.len())
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

/// Why a task failed. Never crosses the pool boundary as a panic.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("worker panicked: {0}")]
    Panicked(String),
}

/// Result of one task, tagged with the chunk it belongs to.
#[derive(Debug)]
pub struct TaskOutcome {
    pub index: u64,
    pub range: ByteRange,
    /// Input length seen by the worker.
    pub input_len: usize,
    pub result: Result<Bytes, TaskError>,
    pub stage_times: StageTimes,
}

impl TaskOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// Lift into the coordinator's error type, keeping the chunk tag.
    pub fn into_result(self) -> Result<(u64, Bytes), TransferError> {
        let index = self.index;
        self.result
            .map(|bytes| (index, bytes))
            .map_err(|source| TransferError::Chunk { index, source })
    }
}
