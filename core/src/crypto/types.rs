use thiserror::Error;

/// Stable key and nonce sizes.
pub const KEY_LEN_32: usize = 32;

/// Standard 12-byte nonce length for AES-GCM and ChaCha20-Poly1305.
pub const NONCE_LEN_12: usize = 12;

/// Fixed AEAD tag length (bytes).
pub const TAG_LEN: usize = 16;

/// HMAC-SHA256 tag length appended by the CTR codecs.
pub const MAC_LEN: usize = 32;

/// Blowfish accepts keys up to 448 bits; we always derive the maximum.
pub const BLOWFISH_KEY_LEN: usize = 56;
pub const BLOWFISH_BLOCK_LEN: usize = 8;

pub const TWOFISH_KEY_LEN: usize = 32;
pub const TWOFISH_BLOCK_LEN: usize = 16;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Invalid key length provided to cipher.
    #[error("invalid key length: expected={expected}, actual={actual}")]
    InvalidKeyLen { expected: usize, actual: usize },

    /// Nonce/IV length mismatch.
    #[error("invalid nonce length: expected={expected}, actual={actual}")]
    InvalidNonceLen { expected: usize, actual: usize },

    /// Input shorter than the fixed envelope overhead.
    #[error("ciphertext too short: need at least {min} bytes, got {actual}")]
    Truncated { min: usize, actual: usize },

    /// AEAD tag or HMAC mismatch (wrong key, wrong salt or tampered bytes).
    #[error("authentication tag mismatch")]
    TagMismatch,

    /// General derivation or runtime error with context.
    #[error("crypto failure: {0}")]
    Failure(String),
}
