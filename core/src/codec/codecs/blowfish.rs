//! Blowfish-CTR + HMAC-SHA256 codec.
//!
//! enc key: 56 bytes from HKDF info "obfs/v1/blowfish/enc".
//! mac key: 32 bytes from HKDF info "obfs/v1/blowfish/mac".

use serde_json::{Map, Value};

use crate::codec::params::{Params, PARAM_KEY, PARAM_SALT};
use crate::codec::types::{crypto_err, Algorithm, Codec, CodecError};
use crate::crypto::{derive_subkey, CryptoError, CtrCipher, CtrMac, KeyPurpose, BLOWFISH_KEY_LEN, MAC_LEN};

pub struct BlowfishCodec {
    envelope: CtrMac,
}

impl BlowfishCodec {
    pub fn new(key: &[u8], salt: &[u8]) -> Result<Self, CodecError> {
        let to_config = |e: CryptoError| CodecError::config(Algorithm::Blowfish, format!("{e}"));
        let name = Algorithm::Blowfish.name();
        let enc = derive_subkey::<BLOWFISH_KEY_LEN>(key, salt, name, KeyPurpose::Encrypt).map_err(to_config)?;
        let mac = derive_subkey::<MAC_LEN>(key, salt, name, KeyPurpose::Mac).map_err(to_config)?;
        let envelope = CtrMac::new(CtrCipher::Blowfish, &enc, mac).map_err(to_config)?;
        Ok(Self { envelope })
    }

    pub fn from_params(params: &Map<String, Value>) -> Result<Self, CodecError> {
        let p = Params::new(Algorithm::Blowfish, params);
        Self::new(&p.required_bytes(PARAM_KEY)?, &p.required_bytes(PARAM_SALT)?)
    }
}

impl Codec for BlowfishCodec {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Blowfish
    }

    fn obfuscate(&self, input: &[u8]) -> Result<Vec<u8>, CodecError> {
        self.envelope.seal(input).map_err(crypto_err(Algorithm::Blowfish))
    }

    fn deobfuscate(&self, input: &[u8]) -> Result<Vec<u8>, CodecError> {
        self.envelope.open(input).map_err(crypto_err(Algorithm::Blowfish))
    }
}
