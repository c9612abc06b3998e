//! utils.rs
//! Size arithmetic shared by the transfer layers.

use serde::{Deserialize, Serialize};

use crate::constants::{GIGABYTE, KILOBYTE, MAX_CHUNK_MB, MEGABYTE};

/// Number of chunks a payload splits into: `ceil(file_size / chunk_size)`,
/// never less than 1. A zero `chunk_size` is treated as "one chunk".
pub fn chunk_count(file_size: u64, chunk_size: u64) -> u64 {
    if chunk_size == 0 {
        return 1;
    }
    file_size.div_ceil(chunk_size).max(1)
}

/// Megabytes to bytes.
pub fn mbs_to_bytes(mb: usize) -> u64 {
    (mb as u64) * MEGABYTE as u64
}

/// Human readable size with up to two decimals: `512B`, `1.5KB`, `2MB`.
pub fn human_size(bytes: u64) -> String {
    let (div, unit) = if bytes >= GIGABYTE as u64 {
        (GIGABYTE as f64, "GB")
    } else if bytes >= MEGABYTE as u64 {
        (MEGABYTE as f64, "MB")
    } else if bytes >= KILOBYTE as u64 {
        (KILOBYTE as f64, "KB")
    } else {
        return format!("{bytes}B");
    };
    let rounded = (bytes as f64 / div * 100.0).round() / 100.0;
    // `{}` on f64 prints 2.0 as "2" and 1.50 as "1.5".
    format!("{rounded}{unit}")
}

/// How a file of a given size will be transferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePlan {
    pub file_size: u64,
    pub chunk_size: u64,
    pub chunk_count: u64,
    pub human_size: String,
}

impl FilePlan {
    /// `chunk_mb` is clamped into `1..=MAX_CHUNK_MB`.
    pub fn analyze(file_size: u64, chunk_mb: usize) -> Self {
        let chunk_size = mbs_to_bytes(chunk_mb.clamp(1, MAX_CHUNK_MB));
        Self {
            file_size,
            chunk_size,
            chunk_count: chunk_count(file_size, chunk_size),
            human_size: human_size(file_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_size_units() {
        assert_eq!(human_size(512), "512B");
        assert_eq!(human_size(1536), "1.5KB");
        assert_eq!(human_size(2 * MEGABYTE as u64), "2MB");
        assert_eq!(human_size(GIGABYTE as u64 + GIGABYTE as u64 / 4), "1.25GB");
    }

    #[test]
    fn analyze_clamps_chunk_size() {
        let plan = FilePlan::analyze(250 * MEGABYTE as u64, 0);
        assert_eq!(plan.chunk_size, MEGABYTE as u64);
        assert_eq!(plan.chunk_count, 250);

        let plan = FilePlan::analyze(10, 1000);
        assert_eq!(plan.chunk_size, mbs_to_bytes(MAX_CHUNK_MB));
        assert_eq!(plan.chunk_count, 1);
    }
}
