//! codec/codecs/mod.rs
//! Concrete codec implementations, one per algorithm.

pub mod xor;
pub mod base64;
pub mod aes;
pub mod blowfish;
pub mod twofish;
pub mod chacha20;
pub mod deflate;
