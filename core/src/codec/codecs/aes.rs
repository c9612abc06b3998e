//! AES-256-GCM codec.
//!
//! Key = HKDF-SHA256(key, salt, "obfs/v1/aes/enc"), 32 bytes.
//! Output = nonce(12) || ciphertext || tag(16).

use serde_json::{Map, Value};

use crate::codec::params::{Params, PARAM_KEY, PARAM_SALT};
use crate::codec::types::{crypto_err, Algorithm, Codec, CodecError};
use crate::crypto::{derive_subkey, CryptoError, AeadImpl, KeyPurpose, KEY_LEN_32};

pub struct AesCodec {
    aead: AeadImpl,
}

impl AesCodec {
    pub fn new(key: &[u8], salt: &[u8]) -> Result<Self, CodecError> {
        let to_config = |e: CryptoError| CodecError::config(Algorithm::Aes, format!("{e}"));
        let subkey = derive_subkey::<KEY_LEN_32>(key, salt, Algorithm::Aes.name(), KeyPurpose::Encrypt)
            .map_err(to_config)?;
        let aead = AeadImpl::aes_256_gcm(&subkey).map_err(to_config)?;
        Ok(Self { aead })
    }

    pub fn from_params(params: &Map<String, Value>) -> Result<Self, CodecError> {
        let p = Params::new(Algorithm::Aes, params);
        let key = p.required_bytes(PARAM_KEY)?;
        let salt = p.required_bytes(PARAM_SALT)?;
        Self::new(&key, &salt)
    }
}

impl Codec for AesCodec {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Aes
    }

    fn obfuscate(&self, input: &[u8]) -> Result<Vec<u8>, CodecError> {
        self.aead.seal(input).map_err(crypto_err(Algorithm::Aes))
    }

    fn deobfuscate(&self, input: &[u8]) -> Result<Vec<u8>, CodecError> {
        self.aead.open(input).map_err(crypto_err(Algorithm::Aes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_salt_fails_authentication() {
        let a = AesCodec::new(b"key", b"salt-a").unwrap();
        let b = AesCodec::new(b"key", b"salt-b").unwrap();
        let sealed = a.obfuscate(b"secret").unwrap();
        assert_eq!(a.deobfuscate(&sealed).unwrap(), b"secret");
        assert!(b.deobfuscate(&sealed).unwrap_err().is_transform());
    }
}
