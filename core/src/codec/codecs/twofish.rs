//! Twofish-256-CTR + HMAC-SHA256 codec.

use serde_json::{Map, Value};

use crate::codec::params::{Params, PARAM_KEY, PARAM_SALT};
use crate::codec::types::{crypto_err, Algorithm, Codec, CodecError};
use crate::crypto::{derive_subkey, CryptoError, CtrCipher, CtrMac, KeyPurpose, MAC_LEN, TWOFISH_KEY_LEN};

pub struct TwofishCodec {
    envelope: CtrMac,
}

impl TwofishCodec {
    pub fn new(key: &[u8], salt: &[u8]) -> Result<Self, CodecError> {
        let to_config = |e: CryptoError| CodecError::config(Algorithm::Twofish, format!("{e}"));
        let name = Algorithm::Twofish.name();
        let enc = derive_subkey::<TWOFISH_KEY_LEN>(key, salt, name, KeyPurpose::Encrypt).map_err(to_config)?;
        let mac = derive_subkey::<MAC_LEN>(key, salt, name, KeyPurpose::Mac).map_err(to_config)?;
        let envelope = CtrMac::new(CtrCipher::Twofish, &enc, mac).map_err(to_config)?;
        Ok(Self { envelope })
    }

    pub fn from_params(params: &Map<String, Value>) -> Result<Self, CodecError> {
        let p = Params::new(Algorithm::Twofish, params);
        Self::new(&p.required_bytes(PARAM_KEY)?, &p.required_bytes(PARAM_SALT)?)
    }
}

impl Codec for TwofishCodec {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Twofish
    }

    fn obfuscate(&self, input: &[u8]) -> Result<Vec<u8>, CodecError> {
        self.envelope.seal(input).map_err(crypto_err(Algorithm::Twofish))
    }

    fn deobfuscate(&self, input: &[u8]) -> Result<Vec<u8>, CodecError> {
        self.envelope.open(input).map_err(crypto_err(Algorithm::Twofish))
    }
}
