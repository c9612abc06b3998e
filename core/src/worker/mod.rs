//! worker/mod.rs
//! Worker dispatcher: bounded pool running one chain execution per task.

pub mod types;
pub mod pool;

pub use types::*;
pub use pool::{PoolStats, Permit, TaskHandle, WorkerPool};
