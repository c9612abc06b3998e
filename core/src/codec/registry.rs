//! codec/registry.rs
//! Codec registry and factory functions.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::codec::codecs::{aes, base64, blowfish, chacha20, deflate, twofish, xor};
use crate::codec::params::{PARAM_KEY, PARAM_LEVEL, PARAM_ROUNDS, PARAM_SALT};
use crate::codec::types::{Algorithm, Codec, CodecError};

/// Static description of a registered algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CodecInfo {
    pub algorithm: Algorithm,
    pub name: &'static str,
    pub id: u16,
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
    /// Output depends only on input and parameters (no random nonce).
    pub deterministic: bool,
}

const KEY_SALT: &[&str] = &[PARAM_KEY, PARAM_SALT];

pub fn info(algorithm: Algorithm) -> CodecInfo {
    let (required, optional, deterministic): (&'static [&'static str], &'static [&'static str], bool) =
        match algorithm {
            Algorithm::Xor => (&[PARAM_KEY], &[], true),
            Algorithm::Base64 => (&[], &[PARAM_ROUNDS], true),
            Algorithm::Aes | Algorithm::Blowfish | Algorithm::Twofish | Algorithm::Chacha20 => {
                (KEY_SALT, &[], false)
            }
            Algorithm::Deflate => (&[], &[PARAM_LEVEL], true),
        };
    CodecInfo {
        algorithm,
        name: algorithm.name(),
        id: algorithm.id(),
        required,
        optional,
        deterministic,
    }
}

/// Resolve an algorithm by its config name.
pub fn resolve(name: &str) -> Result<CodecInfo, CodecError> {
    name.parse::<Algorithm>().map(info)
}

/// Resolve an algorithm by its stable numeric id.
pub fn resolve_id(id: u16) -> Result<CodecInfo, CodecError> {
    Algorithm::try_from(id)
        .map(info)
        .map_err(|_| CodecError::UnknownAlgorithm { name: format!("0x{id:04x}") })
}

/// Every registered algorithm, in id order.
pub fn catalog() -> Vec<CodecInfo> {
    Algorithm::ALL.iter().copied().map(info).collect()
}

/// Build a ready-to-run codec. All parameter checks happen here.
pub fn create_codec(
    algorithm: Algorithm,
    params: &Map<String, Value>,
) -> Result<Box<dyn Codec>, CodecError> {
    Ok(match algorithm {
        Algorithm::Xor => Box::new(xor::XorCodec::from_params(params)?),
        Algorithm::Base64 => Box::new(base64::Base64Codec::from_params(params)?),
        Algorithm::Aes => Box::new(aes::AesCodec::from_params(params)?),
        Algorithm::Blowfish => Box::new(blowfish::BlowfishCodec::from_params(params)?),
        Algorithm::Twofish => Box::new(twofish::TwofishCodec::from_params(params)?),
        Algorithm::Chacha20 => Box::new(chacha20::ChaCha20Codec::from_params(params)?),
        Algorithm::Deflate => Box::new(deflate::DeflateCodec::from_params(params)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_by_name_and_id_agree() {
        for info in catalog() {
            assert_eq!(resolve(info.name).unwrap(), info);
            assert_eq!(resolve_id(info.id).unwrap(), info);
        }
    }

    #[test]
    fn unknown_names_are_not_configuration_errors() {
        let err = resolve("rot13").unwrap_err();
        assert!(err.is_unknown_algorithm());
        assert!(!err.is_configuration());
        assert!(resolve_id(0xbeef).unwrap_err().is_unknown_algorithm());
    }
}
