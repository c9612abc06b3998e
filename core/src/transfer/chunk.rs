//! transfer/chunk.rs
//! Chunks, byte ranges and the range header.
//!
//! A payload of `file_size` bytes splits into `chunk_count(file_size,
//! chunk_size)` chunks. Chunk `i` covers `[i * chunk_size, min((i + 1) *
//! chunk_size, file_size))`. An empty payload is one empty chunk.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::RangeHeaderStyle;
use crate::utils::chunk_count;

/// Half-open byte range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RangeError {
    #[error("range header must start with `{unit}=`: {value:?}")]
    WrongUnit { unit: String, value: String },
    #[error("malformed range {value:?}")]
    Malformed { value: String },
    #[error("range end {end} before start {start}")]
    Inverted { start: u64, end: u64 },
}

impl ByteRange {
    pub fn new(start: u64, len: u64) -> Self {
        Self { start, end: start + len }
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// `"<unit>=<start>-<last>"` with an inclusive last byte.
    /// An empty range has no header form.
    pub fn header_value(&self, unit: &str) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        Some(format!("{unit}={}-{}", self.start, self.end - 1))
    }

    /// Header name and value, ready to attach to a request.
    pub fn header(&self, style: &RangeHeaderStyle) -> Option<(String, String)> {
        self.header_value(&style.unit).map(|v| (style.name.clone(), v))
    }

    /// Parse `"<unit>=<start>-<last>"` (inclusive last byte).
    pub fn parse_header_value(value: &str, unit: &str) -> Result<Self, RangeError> {
        let spec = value
            .trim()
            .strip_prefix(unit)
            .and_then(|rest| rest.strip_prefix('='))
            .ok_or_else(|| RangeError::WrongUnit { unit: unit.to_string(), value: value.to_string() })?;

        let malformed = || RangeError::Malformed { value: value.to_string() };
        let (start, last) = spec.split_once('-').ok_or_else(malformed)?;
        let start: u64 = start.trim().parse().map_err(|_| malformed())?;
        let last: u64 = last.trim().parse().map_err(|_| malformed())?;
        if last < start {
            return Err(RangeError::Inverted { start, end: last });
        }
        Ok(Self { start, end: last + 1 })
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// One slice of a payload. `data` is raw bytes on upload and wire bytes
/// (still obfuscated) on download; `range` always refers to the raw payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: u64,
    pub range: ByteRange,
    pub data: Bytes,
}

impl Chunk {
    pub fn new(index: u64, range: ByteRange, data: Bytes) -> Self {
        Self { index, range, data }
    }

    pub fn offset(&self) -> u64 {
        self.range.start
    }

    pub fn raw_size(&self) -> u64 {
        self.range.len()
    }
}

/// Byte ranges of every chunk, in ascending index order.
/// A zero `chunk_size` means "whole payload in one chunk".
pub fn chunk_ranges(file_size: u64, chunk_size: u64) -> impl Iterator<Item = (u64, ByteRange)> {
    let chunk_size = if chunk_size == 0 { file_size.max(1) } else { chunk_size };
    let count = chunk_count(file_size, chunk_size);
    (0..count).map(move |i| {
        let start = (i * chunk_size).min(file_size);
        let end = start.saturating_add(chunk_size).min(file_size);
        (i, ByteRange { start, end })
    })
}

/// Split `payload` into zero-copy chunks of at most `chunk_size` bytes.
pub fn partition(payload: &Bytes, chunk_size: u64) -> Vec<Chunk> {
    chunk_ranges(payload.len() as u64, chunk_size)
        .map(|(i, r)| Chunk::new(i, r, payload.slice(r.start as usize..r.end as usize)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_chunk_is_short() {
        let payload = Bytes::from(vec![7u8; 10]);
        let chunks = partition(&payload, 4);
        let sizes: Vec<u64> = chunks.iter().map(Chunk::raw_size).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
        assert_eq!(chunks[2].offset(), 8);
    }

    #[test]
    fn empty_payload_is_one_empty_chunk() {
        let chunks = partition(&Bytes::new(), 4);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].range.is_empty());
        assert_eq!(chunks[0].range.header_value("bytes"), None);
    }

    #[test]
    fn header_uses_inclusive_end() {
        let r = ByteRange::new(1024, 1024);
        assert_eq!(r.header_value("bytes").unwrap(), "bytes=1024-2047");
        assert_eq!(ByteRange::parse_header_value("bytes=1024-2047", "bytes").unwrap(), r);

        let style = RangeHeaderStyle { name: "X-Range".into(), unit: "chunks".into() };
        assert_eq!(r.header(&style).unwrap(), ("X-Range".to_string(), "chunks=1024-2047".to_string()));
    }

    #[test]
    fn bad_headers_rejected() {
        assert!(matches!(ByteRange::parse_header_value("items=0-1", "bytes"), Err(RangeError::WrongUnit { .. })));
        assert!(matches!(ByteRange::parse_header_value("bytes=5", "bytes"), Err(RangeError::Malformed { .. })));
        assert!(matches!(ByteRange::parse_header_value("bytes=9-3", "bytes"), Err(RangeError::Inverted { .. })));
    }
}
