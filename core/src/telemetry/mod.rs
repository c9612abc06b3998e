//! telemetry/mod.rs
//! Transfer telemetry: counters, stage timers, immutable snapshots.

pub mod counters;
pub mod timers;
pub mod snapshot;

pub use counters::*;
pub use timers::*;
pub use snapshot::*;
