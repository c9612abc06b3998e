//! crypto/mod.rs
//! Keyed primitives behind the cipher codecs: HKDF subkeys, AEAD and
//! CTR+HMAC envelopes, random nonces.

pub mod types;
pub mod kdf;
pub mod nonce;
pub mod aead;
pub mod ctr_mac;

pub use types::*;
pub use kdf::*;
pub use aead::*;
pub use ctr_mac::*;
