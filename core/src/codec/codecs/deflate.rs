//! Deflate (zlib wrapper) via flate2.
//!
//! Frame: orig_len(u32 LE) || zlib stream || crc32(plaintext, u32 LE)

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde_json::{Map, Value};

use crate::codec::params::{Params, PARAM_LEVEL};
use crate::codec::types::{Algorithm, Codec, CodecError};

pub const DEFAULT_LEVEL: u32 = 6;
const FRAME_OVERHEAD: usize = 8;

pub struct DeflateCodec {
    level: Compression,
}

impl DeflateCodec {
    pub fn new(level: u32) -> Result<Self, CodecError> {
        if level > 9 {
            return Err(CodecError::config(Algorithm::Deflate, "level must be in 0..=9"));
        }
        Ok(Self { level: Compression::new(level) })
    }

    pub fn from_params(params: &Map<String, Value>) -> Result<Self, CodecError> {
        let p = Params::new(Algorithm::Deflate, params);
        Self::new(p.bounded_u32(PARAM_LEVEL, 0, 9, DEFAULT_LEVEL)?)
    }
}

fn fail(e: impl std::fmt::Display) -> CodecError {
    CodecError::transform(Algorithm::Deflate, e)
}

fn read_u32_le(bytes: &[u8]) -> Result<u32, CodecError> {
    let arr: [u8; 4] = bytes.try_into().map_err(|_| fail("short length field"))?;
    Ok(u32::from_le_bytes(arr))
}

impl Codec for DeflateCodec {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Deflate
    }

    fn obfuscate(&self, input: &[u8]) -> Result<Vec<u8>, CodecError> {
        let orig_len = u32::try_from(input.len()).map_err(|_| fail("input exceeds 4 GiB frame limit"))?;

        let mut enc = ZlibEncoder::new(Vec::new(), self.level);
        enc.write_all(input).map_err(fail)?;
        let compressed = enc.finish().map_err(fail)?;

        let mut out = Vec::with_capacity(compressed.len() + FRAME_OVERHEAD);
        out.extend_from_slice(&orig_len.to_le_bytes());
        out.extend_from_slice(&compressed);
        out.extend_from_slice(&crc32fast::hash(input).to_le_bytes());
        Ok(out)
    }

    fn deobfuscate(&self, input: &[u8]) -> Result<Vec<u8>, CodecError> {
        if input.len() < FRAME_OVERHEAD {
            return Err(fail("input too short for length+checksum frame"));
        }
        let orig_len = read_u32_le(&input[..4])? as usize;
        let compressed = &input[4..input.len() - 4];
        let expected_crc = read_u32_le(&input[input.len() - 4..])?;

        // The length prefix is untrusted: bound both the allocation and the inflate.
        let mut decoded = Vec::with_capacity(orig_len.min(compressed.len().saturating_mul(4)));
        ZlibDecoder::new(compressed)
            .take(orig_len as u64 + 1)
            .read_to_end(&mut decoded)
            .map_err(fail)?;

        if decoded.len() > orig_len {
            return Err(fail(format!("decoded data exceeds prefix {orig_len}")));
        }
        if decoded.len() != orig_len {
            return Err(fail(format!("decoded size {} != prefix {}", decoded.len(), orig_len)));
        }
        let actual_crc = crc32fast::hash(&decoded);
        if actual_crc != expected_crc {
            return Err(fail(format!("checksum mismatch: expected {expected_crc:08x}, got {actual_crc:08x}")));
        }
        Ok(decoded)
    }
}
