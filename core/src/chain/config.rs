//! chain/config.rs
//! The obfuscation config document.
//!
//! Wire format, shared by every endpoint and pasted between UIs verbatim:
//! `[{"algo": "<name>", "config": {<param>: <value>, ...}}, ...]`

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::codec::{Algorithm, CodecError};

/// One step of a chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObfuscatorSpec {
    #[serde(rename = "algo")]
    pub algorithm: Algorithm,
    #[serde(rename = "config", default)]
    pub parameters: Map<String, Value>,
}

impl ObfuscatorSpec {
    pub fn new(algorithm: Algorithm) -> Self {
        Self { algorithm, parameters: Map::new() }
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.to_string(), value.into());
        self
    }
}

/// Ordered, order-significant sequence of specs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObfuscationConfig(Vec<ObfuscatorSpec>);

/// Untyped view used while parsing, so an unknown `algo` surfaces as
/// `UnknownAlgorithm` rather than a generic JSON error.
#[derive(Deserialize)]
struct RawSpec {
    algo: String,
    #[serde(default)]
    config: Option<Value>,
}

impl ObfuscationConfig {
    pub fn new(specs: Vec<ObfuscatorSpec>) -> Self {
        Self(specs)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn specs(&self) -> &[ObfuscatorSpec] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn from_json(text: &str) -> Result<Self, CodecError> {
        let raw: Vec<RawSpec> =
            serde_json::from_str(text).map_err(|e| CodecError::MalformedConfig(e.to_string()))?;

        raw.into_iter()
            .enumerate()
            .map(|(i, r)| {
                let algorithm = Algorithm::from_str(&r.algo)?;
                let parameters = match r.config {
                    None | Some(Value::Null) => Map::new(),
                    Some(Value::Object(m)) => m,
                    Some(_) => {
                        return Err(CodecError::MalformedConfig(format!(
                            "entry {i} ({}): `config` must be an object",
                            r.algo
                        )))
                    }
                };
                Ok(ObfuscatorSpec { algorithm, parameters })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    pub fn to_json(&self) -> Result<String, CodecError> {
        serde_json::to_string(self).map_err(|e| CodecError::MalformedConfig(e.to_string()))
    }
}

impl From<Vec<ObfuscatorSpec>> for ObfuscationConfig {
    fn from(specs: Vec<ObfuscatorSpec>) -> Self {
        Self(specs)
    }
}

impl FromStr for ObfuscationConfig {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_json(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_format() {
        let cfg = ObfuscationConfig::from_json(
            r#"[{"algo":"xor","config":{"key":"k"}},{"algo":"base64","config":{"rounds":2}},{"algo":"deflate"}]"#,
        )
        .unwrap();
        assert_eq!(cfg.len(), 3);
        assert_eq!(cfg.specs()[0].algorithm, Algorithm::Xor);
        assert_eq!(cfg.specs()[1].parameters["rounds"], 2);
        assert!(cfg.specs()[2].parameters.is_empty());
    }

    #[test]
    fn unknown_algo_rejected_at_parse_time() {
        let err = ObfuscationConfig::from_json(r#"[{"algo":"rot13","config":{}}]"#).unwrap_err();
        assert_eq!(err, CodecError::UnknownAlgorithm { name: "rot13".into() });
    }

    #[test]
    fn non_array_document_is_malformed() {
        assert!(matches!(
            ObfuscationConfig::from_json(r#"{"algo":"xor"}"#),
            Err(CodecError::MalformedConfig(_))
        ));
    }

    #[test]
    fn json_round_trip_keeps_order() {
        let cfg = ObfuscationConfig::new(vec![
            ObfuscatorSpec::new(Algorithm::Base64),
            ObfuscatorSpec::new(Algorithm::Xor).with("key", "abc"),
        ]);
        let text = cfg.to_json().unwrap();
        assert!(text.starts_with(r#"[{"algo":"base64""#));
        assert_eq!(ObfuscationConfig::from_json(&text).unwrap(), cfg);
    }
}
