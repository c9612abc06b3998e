//! ChaCha20-Poly1305 codec. Same key schedule and envelope as `aes`.

use serde_json::{Map, Value};

use crate::codec::params::{Params, PARAM_KEY, PARAM_SALT};
use crate::codec::types::{crypto_err, Algorithm, Codec, CodecError};
use crate::crypto::{derive_subkey, CryptoError, AeadImpl, KeyPurpose, KEY_LEN_32};

pub struct ChaCha20Codec {
    aead: AeadImpl,
}

impl ChaCha20Codec {
    pub fn new(key: &[u8], salt: &[u8]) -> Result<Self, CodecError> {
        let to_config = |e: CryptoError| CodecError::config(Algorithm::Chacha20, format!("{e}"));
        let subkey =
            derive_subkey::<KEY_LEN_32>(key, salt, Algorithm::Chacha20.name(), KeyPurpose::Encrypt)
                .map_err(to_config)?;
        let aead = AeadImpl::chacha20_poly1305(&subkey).map_err(to_config)?;
        Ok(Self { aead })
    }

    pub fn from_params(params: &Map<String, Value>) -> Result<Self, CodecError> {
        let p = Params::new(Algorithm::Chacha20, params);
        Self::new(&p.required_bytes(PARAM_KEY)?, &p.required_bytes(PARAM_SALT)?)
    }
}

impl Codec for ChaCha20Codec {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Chacha20
    }

    fn obfuscate(&self, input: &[u8]) -> Result<Vec<u8>, CodecError> {
        self.aead.seal(input).map_err(crypto_err(Algorithm::Chacha20))
    }

    fn deobfuscate(&self, input: &[u8]) -> Result<Vec<u8>, CodecError> {
        self.aead.open(input).map_err(crypto_err(Algorithm::Chacha20))
    }
}
