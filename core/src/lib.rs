//! obfs-core
//!
//! Reversible obfuscation chains and chunked, worker-parallel transfers.
//! Pure Rust, synchronous threads, no FFI.

#![forbid(unsafe_code)]

// Shared and top level
pub mod constants;
pub mod types;
pub mod utils;
pub mod config;
pub mod logging;

// Transform layers
pub mod crypto;
pub mod codec;
pub mod chain;

// Execution and transfer layers
pub mod worker;
pub mod transfer;
pub mod telemetry;

// -----------------------------------------------------------------------------
// Prelude (Rust users)
// -----------------------------------------------------------------------------
pub mod prelude {
    pub use crate::chain::{run_chain, ChainExecutor, ObfuscationConfig, ObfuscatorSpec};
    pub use crate::codec::{Algorithm, Codec, CodecError, Direction};
    pub use crate::config::{ParallelismProfile, RangeHeaderStyle, TransferConfig};
    pub use crate::telemetry::TransferSnapshot;
    pub use crate::transfer::{
        CancelToken, MemoryStagingStore, MemoryTransport, StagingStatus, StagingStore,
        TransferCoordinator, TransferDirection, TransferRegistry, Transport,
    };
    pub use crate::types::{IntegrityError, TransferError};
    pub use crate::worker::{WorkerPool, WorkerTask};
}
