//! codec/types.rs
//! Algorithm identifiers, transform direction, the `Codec` contract and its
//! error taxonomy.

use std::fmt;
use std::str::FromStr;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::algo_ids;
use crate::crypto::CryptoError;

/// Closed set of supported algorithms, keyed by a stable `u16` id.
#[repr(u16)]
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
    TryFromPrimitive, IntoPrimitive, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub enum Algorithm {
    Xor      = algo_ids::XOR,
    Base64   = algo_ids::BASE64,
    Aes      = algo_ids::AES,
    Blowfish = algo_ids::BLOWFISH,
    Twofish  = algo_ids::TWOFISH,
    Chacha20 = algo_ids::CHACHA20,
    Deflate  = algo_ids::DEFLATE,
}

impl Algorithm {
    pub const ALL: [Algorithm; 7] = [
        Algorithm::Xor,
        Algorithm::Base64,
        Algorithm::Aes,
        Algorithm::Blowfish,
        Algorithm::Twofish,
        Algorithm::Chacha20,
        Algorithm::Deflate,
    ];

    /// Lowercase name used in the JSON config (`"algo"` field).
    pub const fn name(self) -> &'static str {
        match self {
            Algorithm::Xor      => "xor",
            Algorithm::Base64   => "base64",
            Algorithm::Aes      => "aes",
            Algorithm::Blowfish => "blowfish",
            Algorithm::Twofish  => "twofish",
            Algorithm::Chacha20 => "chacha20",
            Algorithm::Deflate  => "deflate",
        }
    }

    pub fn id(self) -> u16 {
        self.into()
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Algorithm::ALL
            .iter()
            .copied()
            .find(|a| a.name() == s)
            .ok_or_else(|| CodecError::UnknownAlgorithm { name: s.to_string() })
    }
}

impl TryFrom<String> for Algorithm {
    type Error = CodecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Algorithm> for String {
    fn from(a: Algorithm) -> Self {
        a.name().to_string()
    }
}

/// Direction of a transform.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "obf")]
    Obfuscate,
    #[serde(rename = "deobf")]
    Deobfuscate,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Obfuscate => f.write_str("obf"),
            Direction::Deobfuscate => f.write_str("deobf"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Missing or invalid parameter. Raised before any byte is transformed.
    #[error("configuration error for {algorithm}: {reason}")]
    Configuration { algorithm: &'static str, reason: String },

    /// The config document itself could not be parsed.
    #[error("malformed obfuscation config: {0}")]
    MalformedConfig(String),

    /// The chain names an algorithm the registry does not know.
    #[error("unknown obfuscation algorithm: {name}")]
    UnknownAlgorithm { name: String },

    /// A codec failed on the given bytes (corrupt input, wrong key).
    #[error("{algorithm} transform failed: {reason}")]
    Transform { algorithm: &'static str, reason: String },
}

impl CodecError {
    pub fn config(algorithm: Algorithm, reason: impl Into<String>) -> Self {
        CodecError::Configuration { algorithm: algorithm.name(), reason: reason.into() }
    }

    pub fn transform(algorithm: Algorithm, reason: impl fmt::Display) -> Self {
        CodecError::Transform { algorithm: algorithm.name(), reason: reason.to_string() }
    }

    /// "Bad parameters" as opposed to "bad chain" or "bad bytes".
    pub fn is_configuration(&self) -> bool {
        matches!(self, CodecError::Configuration { .. } | CodecError::MalformedConfig(_))
    }

    pub fn is_unknown_algorithm(&self) -> bool {
        matches!(self, CodecError::UnknownAlgorithm { .. })
    }

    pub fn is_transform(&self) -> bool {
        matches!(self, CodecError::Transform { .. })
    }
}

/// Lift a crypto failure into a transform error for `algorithm`.
pub(crate) fn crypto_err(algorithm: Algorithm) -> impl Fn(CryptoError) -> CodecError {
    move |e| CodecError::transform(algorithm, e)
}

/// A pure, symmetric transform over byte sequences.
///
/// `deobfuscate(obfuscate(v)) == v` for every `v` with identical parameters.
/// Implementations hold only immutable, already-normalized parameters, so a
/// codec can be shared by reference across threads.
pub trait Codec: Send + Sync {
    fn algorithm(&self) -> Algorithm;

    fn obfuscate(&self, input: &[u8]) -> Result<Vec<u8>, CodecError>;

    fn deobfuscate(&self, input: &[u8]) -> Result<Vec<u8>, CodecError>;

    fn apply(&self, direction: Direction, input: &[u8]) -> Result<Vec<u8>, CodecError> {
        match direction {
            Direction::Obfuscate => self.obfuscate(input),
            Direction::Deobfuscate => self.deobfuscate(input),
        }
    }
}
