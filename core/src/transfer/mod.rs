//! transfer/mod.rs
//! Chunked transfer coordinator and its collaborators.

pub mod chunk;
pub mod cancel;
pub mod progress;
pub mod transport;
pub mod memory;
pub mod registry;
pub mod ordered;
pub mod staging;
pub mod coordinator;
pub mod upload;
pub mod download;

pub use cancel::CancelToken;
pub use chunk::{chunk_ranges, partition, ByteRange, Chunk, RangeError};
pub use coordinator::TransferCoordinator;
pub use download::Reassembled;
pub use memory::MemoryTransport;
pub use ordered::OrderedAssembler;
pub use progress::{ProgressFn, ProgressTracker, StagingStatus};
pub use registry::{ConcurrencyMisuseError, TransferDirection, TransferGuard, TransferInfo, TransferRegistry};
pub use staging::{DirStagingStore, MemoryStagingStore, StagedFile, StagingError, StagingStore};
pub use transport::{Transport, TransportError};
