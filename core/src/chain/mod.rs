//! chain/mod.rs
//! Chain executor over an ordered obfuscation config.

pub mod config;
pub mod executor;

pub use config::{ObfuscationConfig, ObfuscatorSpec};
pub use executor::{run_chain, ChainExecutor};
