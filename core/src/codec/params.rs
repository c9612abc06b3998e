//! codec/params.rs
//! Normalization of the free-form `config` object attached to each spec.
//!
//! Byte parameters (`key`, `salt`) accept either a JSON string (taken as its
//! UTF-8 bytes) or an array of integers in `0..=255`. Everything is checked
//! here, so codecs are only ever constructed from valid parameters.

use serde_json::{Map, Value};

use crate::codec::types::{Algorithm, CodecError};

pub const PARAM_KEY: &str = "key";
pub const PARAM_SALT: &str = "salt";
pub const PARAM_ROUNDS: &str = "rounds";
pub const PARAM_LEVEL: &str = "level";

/// Borrowed view over one spec's parameters.
pub struct Params<'a> {
    algorithm: Algorithm,
    map: &'a Map<String, Value>,
}

impl<'a> Params<'a> {
    pub fn new(algorithm: Algorithm, map: &'a Map<String, Value>) -> Self {
        Self { algorithm, map }
    }

    /// Required, non-empty byte parameter.
    pub fn required_bytes(&self, name: &str) -> Result<Vec<u8>, CodecError> {
        let bytes = self
            .optional_bytes(name)?
            .ok_or_else(|| CodecError::config(self.algorithm, format!("missing required parameter `{name}`")))?;
        if bytes.is_empty() {
            return Err(CodecError::config(self.algorithm, format!("parameter `{name}` must not be empty")));
        }
        Ok(bytes)
    }

    /// Byte parameter that may be absent (or JSON `null`).
    pub fn optional_bytes(&self, name: &str) -> Result<Option<Vec<u8>>, CodecError> {
        match self.map.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_bytes().to_vec())),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| {
                    v.as_u64()
                        .and_then(|n| u8::try_from(n).ok())
                        .ok_or_else(|| {
                            CodecError::config(
                                self.algorithm,
                                format!("parameter `{name}` must be a string or an array of bytes"),
                            )
                        })
                })
                .collect::<Result<Vec<u8>, _>>()
                .map(Some),
            Some(_) => Err(CodecError::config(
                self.algorithm,
                format!("parameter `{name}` must be a string or an array of bytes"),
            )),
        }
    }

    /// Positive integer with a default. Numeric strings ("3") are accepted.
    pub fn positive_u32(&self, name: &str, default: u32) -> Result<u32, CodecError> {
        let parsed = match self.map.get(name) {
            None | Some(Value::Null) => return Ok(default),
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
            Some(_) => None,
        };
        parsed
            .filter(|n| *n >= 1)
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| {
                CodecError::config(self.algorithm, format!("parameter `{name}` must be a positive integer"))
            })
    }

    /// Integer within `lo..=hi`, with a default.
    pub fn bounded_u32(&self, name: &str, lo: u32, hi: u32, default: u32) -> Result<u32, CodecError> {
        let value = match self.map.get(name) {
            None | Some(Value::Null) => return Ok(default),
            Some(v) => v.as_u64(),
        };
        value
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| (lo..=hi).contains(n))
            .ok_or_else(|| {
                CodecError::config(self.algorithm, format!("parameter `{name}` must be an integer in {lo}..={hi}"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn text_and_array_keys_normalize_to_bytes() {
        let m = map(json!({ "key": "ab", "salt": [1, 2, 255] }));
        let p = Params::new(Algorithm::Aes, &m);
        assert_eq!(p.required_bytes("key").unwrap(), b"ab");
        assert_eq!(p.required_bytes("salt").unwrap(), vec![1, 2, 255]);
    }

    #[test]
    fn out_of_range_byte_is_configuration_error() {
        let m = map(json!({ "key": [1, 256] }));
        let err = Params::new(Algorithm::Xor, &m).required_bytes("key").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn rounds_default_and_validation() {
        let empty = Map::new();
        assert_eq!(Params::new(Algorithm::Base64, &empty).positive_u32("rounds", 1).unwrap(), 1);

        let m = map(json!({ "rounds": "3" }));
        assert_eq!(Params::new(Algorithm::Base64, &m).positive_u32("rounds", 1).unwrap(), 3);

        for bad in [json!({ "rounds": 0 }), json!({ "rounds": -2 }), json!({ "rounds": 1.5 }), json!({ "rounds": "x" })] {
            let m = map(bad);
            assert!(Params::new(Algorithm::Base64, &m).positive_u32("rounds", 1).is_err());
        }
    }
}
