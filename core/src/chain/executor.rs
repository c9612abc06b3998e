//! chain/executor.rs
//! Compiles a config into codecs and runs it in either direction.
//!
//! Obfuscate:   v -> c[0] -> c[1] -> ... -> c[n-1] -> base64 (outer)
//! Deobfuscate: v -> base64⁻¹ (outer) -> c[n-1]⁻¹ -> ... -> c[0]⁻¹
//!
//! Every codec is built before any byte is touched, so parameter errors never
//! leave a half-transformed value behind.

use tracing::trace;

use crate::chain::config::ObfuscationConfig;
use crate::codec::codecs::base64::{decode_once, encode_once};
use crate::codec::{create_codec, Codec, CodecError, Direction};

/// A compiled, immutable chain. Cheap to run repeatedly; `Send + Sync`.
pub struct ChainExecutor {
    plan: Vec<Box<dyn Codec>>,
}

impl ChainExecutor {
    pub fn compile(config: &ObfuscationConfig) -> Result<Self, CodecError> {
        let plan = config
            .specs()
            .iter()
            .map(|spec| create_codec(spec.algorithm, &spec.parameters))
            .collect::<Result<Vec<_>, _>>()?;
        trace!(target: "obfs::chain", steps = plan.len(), "[CHAIN] compiled");
        Ok(Self { plan })
    }

    pub fn len(&self) -> usize {
        self.plan.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plan.is_empty()
    }

    pub fn run(&self, direction: Direction, value: &[u8]) -> Result<Vec<u8>, CodecError> {
        match direction {
            Direction::Obfuscate => {
                let mut v = value.to_vec();
                for codec in &self.plan {
                    v = codec.obfuscate(&v)?;
                }
                Ok(encode_once(&v))
            }
            Direction::Deobfuscate => {
                let mut v = decode_once(value)?;
                for codec in self.plan.iter().rev() {
                    v = codec.deobfuscate(&v)?;
                }
                Ok(v)
            }
        }
    }

    pub fn obfuscate(&self, value: &[u8]) -> Result<Vec<u8>, CodecError> {
        self.run(Direction::Obfuscate, value)
    }

    pub fn deobfuscate(&self, value: &[u8]) -> Result<Vec<u8>, CodecError> {
        self.run(Direction::Deobfuscate, value)
    }
}

/// One-shot helper: compile `config` and run it over `value` (bytes or text).
pub fn run_chain(
    direction: Direction,
    value: impl AsRef<[u8]>,
    config: &ObfuscationConfig,
) -> Result<Vec<u8>, CodecError> {
    ChainExecutor::compile(config)?.run(direction, value.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::config::ObfuscatorSpec;
    use crate::codec::Algorithm;

    #[test]
    fn empty_chain_is_single_outer_layer() {
        let out = run_chain(Direction::Obfuscate, "hi", &ObfuscationConfig::empty()).unwrap();
        assert_eq!(out, b"aGk=");
        assert_eq!(run_chain(Direction::Deobfuscate, &out, &ObfuscationConfig::empty()).unwrap(), b"hi");
    }

    #[test]
    fn config_error_beats_transform_error() {
        // Second step is misconfigured; the garbage input must not be reached.
        let cfg = ObfuscationConfig::new(vec![
            ObfuscatorSpec::new(Algorithm::Base64),
            ObfuscatorSpec::new(Algorithm::Aes).with("key", "k"),
        ]);
        let err = run_chain(Direction::Deobfuscate, "%%%", &cfg).unwrap_err();
        assert!(err.is_configuration(), "{err}");
    }
}
