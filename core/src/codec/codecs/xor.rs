//! Repeating-key XOR. Self-inverse.

use serde_json::{Map, Value};

use crate::codec::params::{Params, PARAM_KEY};
use crate::codec::types::{Algorithm, Codec, CodecError};

pub struct XorCodec {
    key: Vec<u8>,
}

impl XorCodec {
    pub fn new(key: Vec<u8>) -> Result<Self, CodecError> {
        if key.is_empty() {
            return Err(CodecError::config(Algorithm::Xor, "key must not be empty"));
        }
        Ok(Self { key })
    }

    pub fn from_params(params: &Map<String, Value>) -> Result<Self, CodecError> {
        let p = Params::new(Algorithm::Xor, params);
        Self::new(p.required_bytes(PARAM_KEY)?)
    }

    fn xor(&self, input: &[u8]) -> Vec<u8> {
        input
            .iter()
            .zip(self.key.iter().cycle())
            .map(|(b, k)| b ^ k)
            .collect()
    }
}

impl Codec for XorCodec {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Xor
    }

    fn obfuscate(&self, input: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(self.xor(input))
    }

    fn deobfuscate(&self, input: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(self.xor(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_repeats_over_input() {
        let c = XorCodec::new(vec![0x01, 0x02]).unwrap();
        assert_eq!(c.obfuscate(&[0, 0, 0, 0, 0]).unwrap(), vec![1, 2, 1, 2, 1]);
    }

    #[test]
    fn applying_twice_is_identity() {
        let c = XorCodec::new(b"k".to_vec()).unwrap();
        let once = c.obfuscate(b"hello").unwrap();
        assert_ne!(once, b"hello");
        assert_eq!(c.obfuscate(&once).unwrap(), b"hello");
    }
}
