//! crypto/ctr_mac.rs
//! Encrypt-then-MAC envelope for the 64/128-bit block ciphers.
//!
//! Envelope layout (wire contract):
//! `iv(block_len) || ciphertext || HMAC-SHA256(mac_key, iv || ciphertext)`
//!
//! - Blowfish runs in CTR mode with a 64-bit big-endian counter.
//! - Twofish-256 runs in CTR mode with a 128-bit big-endian counter.
//! - CTR needs no padding, so ciphertext length == plaintext length.
//! - The MAC is verified (constant time) before any keystream is applied.

use blowfish::Blowfish;
use ctr::cipher::{KeyIvInit, StreamCipher};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use twofish::Twofish;

use crate::crypto::nonce::random_nonce;
use crate::crypto::types::{
    CryptoError, BLOWFISH_BLOCK_LEN, BLOWFISH_KEY_LEN, MAC_LEN, TWOFISH_BLOCK_LEN, TWOFISH_KEY_LEN,
};

type BlowfishCtr = ctr::Ctr64BE<Blowfish>;
type TwofishCtr = ctr::Ctr128BE<Twofish>;
type HmacSha256 = Hmac<Sha256>;

/// Block cipher driven in CTR mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtrCipher {
    Blowfish,
    Twofish,
}

impl CtrCipher {
    pub const fn key_len(self) -> usize {
        match self {
            CtrCipher::Blowfish => BLOWFISH_KEY_LEN,
            CtrCipher::Twofish => TWOFISH_KEY_LEN,
        }
    }

    pub const fn iv_len(self) -> usize {
        match self {
            CtrCipher::Blowfish => BLOWFISH_BLOCK_LEN,
            CtrCipher::Twofish => TWOFISH_BLOCK_LEN,
        }
    }

    fn apply_keystream(self, key: &[u8], iv: &[u8], buf: &mut [u8]) -> Result<(), CryptoError> {
        let bad_len = |_| CryptoError::InvalidKeyLen { expected: self.key_len(), actual: key.len() };
        match self {
            CtrCipher::Blowfish => {
                let mut c = BlowfishCtr::new_from_slices(key, iv).map_err(bad_len)?;
                c.apply_keystream(buf);
            }
            CtrCipher::Twofish => {
                let mut c = TwofishCtr::new_from_slices(key, iv).map_err(bad_len)?;
                c.apply_keystream(buf);
            }
        }
        Ok(())
    }
}

/// Keyed CTR+HMAC envelope. Keys are already derived (see `kdf`).
#[derive(Clone)]
pub struct CtrMac {
    cipher: CtrCipher,
    enc_key: Vec<u8>,
    mac_key: [u8; 32],
}

impl CtrMac {
    pub fn new(cipher: CtrCipher, enc_key: &[u8], mac_key: [u8; 32]) -> Result<Self, CryptoError> {
        if enc_key.len() != cipher.key_len() {
            return Err(CryptoError::InvalidKeyLen {
                expected: cipher.key_len(),
                actual: enc_key.len(),
            });
        }
        Ok(Self { cipher, enc_key: enc_key.to_vec(), mac_key })
    }

    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let iv_len = self.cipher.iv_len();
        let mut out = Vec::with_capacity(iv_len + plaintext.len() + MAC_LEN);

        // Largest IV is 16 bytes; take the prefix the cipher needs.
        let iv: [u8; TWOFISH_BLOCK_LEN] = random_nonce();
        out.extend_from_slice(&iv[..iv_len]);
        out.extend_from_slice(plaintext);

        let (iv_part, body) = out.split_at_mut(iv_len);
        self.cipher.apply_keystream(&self.enc_key, iv_part, body)?;

        let tag = self.mac(&out)?;
        out.extend_from_slice(&tag);
        Ok(out)
    }

    pub fn open(&self, envelope: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let iv_len = self.cipher.iv_len();
        let min = iv_len + MAC_LEN;
        if envelope.len() < min {
            return Err(CryptoError::Truncated { min, actual: envelope.len() });
        }

        let (authed, tag) = envelope.split_at(envelope.len() - MAC_LEN);
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.mac_key)
            .map_err(|_| CryptoError::Failure("HMAC key init failed".into()))?;
        mac.update(authed);
        mac.verify_slice(tag).map_err(|_| CryptoError::TagMismatch)?;

        let (iv, ciphertext) = authed.split_at(iv_len);
        let mut plaintext = ciphertext.to_vec();
        self.cipher.apply_keystream(&self.enc_key, iv, &mut plaintext)?;
        Ok(plaintext)
    }

    fn mac(&self, data: &[u8]) -> Result<[u8; MAC_LEN], CryptoError> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.mac_key)
            .map_err(|_| CryptoError::Failure("HMAC key init failed".into()))?;
        mac.update(data);
        let mut tag = [0u8; MAC_LEN];
        tag.copy_from_slice(&mac.finalize().into_bytes());
        Ok(tag)
    }
}
