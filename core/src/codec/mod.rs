//! codec/mod.rs
//! Codec registry: algorithm ids, parameter normalization, concrete codecs.

pub mod types;
pub mod params;
pub mod registry;
pub mod codecs;

pub use types::*;
pub use registry::{catalog, create_codec, resolve, resolve_id, CodecInfo};
