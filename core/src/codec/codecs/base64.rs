//! Standard-alphabet base64, applied `rounds` times.
//!
//! `encode_once`/`decode_once` are also the chain's outer transport layer.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{Map, Value};

use crate::codec::params::{Params, PARAM_ROUNDS};
use crate::codec::types::{Algorithm, Codec, CodecError};

pub const DEFAULT_ROUNDS: u32 = 1;

#[inline]
pub fn encode_once(input: &[u8]) -> Vec<u8> {
    STANDARD.encode(input).into_bytes()
}

#[inline]
pub fn decode_once(input: &[u8]) -> Result<Vec<u8>, CodecError> {
    STANDARD
        .decode(input)
        .map_err(|e| CodecError::transform(Algorithm::Base64, e))
}

pub struct Base64Codec {
    rounds: u32,
}

impl Base64Codec {
    pub fn new(rounds: u32) -> Result<Self, CodecError> {
        if rounds == 0 {
            return Err(CodecError::config(Algorithm::Base64, "rounds must be a positive integer"));
        }
        Ok(Self { rounds })
    }

    pub fn from_params(params: &Map<String, Value>) -> Result<Self, CodecError> {
        let p = Params::new(Algorithm::Base64, params);
        Self::new(p.positive_u32(PARAM_ROUNDS, DEFAULT_ROUNDS)?)
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }
}

impl Codec for Base64Codec {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Base64
    }

    fn obfuscate(&self, input: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut value = input.to_vec();
        for _ in 0..self.rounds {
            value = encode_once(&value);
        }
        Ok(value)
    }

    fn deobfuscate(&self, input: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut value = input.to_vec();
        for _ in 0..self.rounds {
            value = decode_once(&value)?;
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_rounds_nest_encodings() {
        let c = Base64Codec::new(2).unwrap();
        // "hi" -> "aGk=" -> "YUdrPQ=="
        assert_eq!(c.obfuscate(b"hi").unwrap(), b"YUdrPQ==");
        assert_eq!(c.deobfuscate(b"YUdrPQ==").unwrap(), b"hi");
    }

    #[test]
    fn invalid_text_is_transform_error() {
        let c = Base64Codec::new(1).unwrap();
        assert!(c.deobfuscate(b"!!not base64!!").unwrap_err().is_transform());
    }
}
