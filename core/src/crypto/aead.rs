//! crypto/aead.rs
//! AEAD envelope for AES-256-GCM and ChaCha20-Poly1305.
//!
//! Envelope layout (wire contract):
//! `nonce(12) || ciphertext || tag(16)`
//!
//! - Both ciphers use 32-byte keys and 12-byte nonces.
//! - The nonce is random per call; no AAD is bound.
//! - Tag verification fails closed: no partial plaintext is ever returned.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce as AesNonce};
use chacha20poly1305::{ChaCha20Poly1305, Nonce as ChaNonce};

use crate::crypto::nonce::{random_nonce, split_nonce};
use crate::crypto::types::{CryptoError, KEY_LEN_32, NONCE_LEN_12, TAG_LEN};

/// Unified AEAD cipher implementation.
#[derive(Clone)]
pub enum AeadImpl {
    AesGcm(Aes256Gcm),
    ChaCha(ChaCha20Poly1305),
}

impl AeadImpl {
    pub fn aes_256_gcm(key: &[u8]) -> Result<Self, CryptoError> {
        check_key_len(key)?;
        let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLen {
            expected: KEY_LEN_32,
            actual: key.len(),
        })?;
        Ok(Self::AesGcm(cipher))
    }

    pub fn chacha20_poly1305(key: &[u8]) -> Result<Self, CryptoError> {
        check_key_len(key)?;
        let cipher = ChaCha20Poly1305::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLen {
            expected: KEY_LEN_32,
            actual: key.len(),
        })?;
        Ok(Self::ChaCha(cipher))
    }

    /// Encrypt `plaintext` under a fresh nonce and return the full envelope.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let nonce: [u8; NONCE_LEN_12] = random_nonce();
        let sealed = match self {
            AeadImpl::AesGcm(cipher) => cipher
                .encrypt(AesNonce::from_slice(&nonce), plaintext)
                .map_err(|_| CryptoError::Failure("AES-GCM seal failed".into()))?,
            AeadImpl::ChaCha(cipher) => cipher
                .encrypt(ChaNonce::from_slice(&nonce), plaintext)
                .map_err(|_| CryptoError::Failure("ChaCha20-Poly1305 seal failed".into()))?,
        };

        let mut out = Vec::with_capacity(NONCE_LEN_12 + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    /// Verify and decrypt an envelope produced by `seal`.
    pub fn open(&self, envelope: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let min = NONCE_LEN_12 + TAG_LEN;
        if envelope.len() < min {
            return Err(CryptoError::Truncated { min, actual: envelope.len() });
        }
        let (nonce, ciphertext_and_tag) = split_nonce::<NONCE_LEN_12>(envelope)
            .ok_or(CryptoError::Truncated { min, actual: envelope.len() })?;

        match self {
            AeadImpl::AesGcm(cipher) => cipher
                .decrypt(AesNonce::from_slice(&nonce), ciphertext_and_tag)
                .map_err(|_| CryptoError::TagMismatch),
            AeadImpl::ChaCha(cipher) => cipher
                .decrypt(ChaNonce::from_slice(&nonce), ciphertext_and_tag)
                .map_err(|_| CryptoError::TagMismatch),
        }
    }
}

fn check_key_len(key: &[u8]) -> Result<(), CryptoError> {
    if key.len() != KEY_LEN_32 {
        return Err(CryptoError::InvalidKeyLen {
            expected: KEY_LEN_32,
            actual: key.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_empty_plaintext() {
        let aead = AeadImpl::aes_256_gcm(&[7u8; 32]).unwrap();
        let env = aead.seal(b"").unwrap();
        assert_eq!(env.len(), NONCE_LEN_12 + TAG_LEN);
        assert_eq!(aead.open(&env).unwrap(), b"");
    }

    #[test]
    fn tampered_envelope_fails_closed() {
        let aead = AeadImpl::chacha20_poly1305(&[9u8; 32]).unwrap();
        let mut env = aead.seal(b"payload").unwrap();
        let last = env.len() - 1;
        env[last] ^= 0x01;
        assert_eq!(aead.open(&env), Err(CryptoError::TagMismatch));
    }

    #[test]
    fn short_key_rejected() {
        assert!(matches!(
            AeadImpl::aes_256_gcm(&[0u8; 16]),
            Err(CryptoError::InvalidKeyLen { expected: 32, actual: 16 })
        ));
    }
}
