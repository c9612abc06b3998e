//! config.rs
//! Transfer tuning knobs, loaded from JSON or built in code.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{
    DEFAULT_CHUNK_SIZE, DEFAULT_RANGE_HEADER, DEFAULT_RANGE_UNIT, MAX_CHUNK_SIZE,
    MAX_CONCURRENCY_CAP, MAX_STAGING_REQ, MAX_WORKERS,
};
use crate::types::TransferError;

/// Name and unit of the byte-range header (`Range: bytes=0-1023`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeHeaderStyle {
    pub name: String,
    pub unit: String,
}

impl Default for RangeHeaderStyle {
    fn default() -> Self {
        Self { name: DEFAULT_RANGE_HEADER.to_string(), unit: DEFAULT_RANGE_UNIT.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Bytes per chunk (the last chunk may be shorter).
    pub chunk_size: usize,
    /// Obfuscate/deobfuscate tasks in flight per transfer.
    pub max_workers: usize,
    /// Concurrent range fetches while staging a download.
    pub max_staging_requests: usize,
    pub range_header: RangeHeaderStyle,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_workers: MAX_WORKERS,
            max_staging_requests: MAX_STAGING_REQ,
            range_header: RangeHeaderStyle::default(),
        }
    }
}

impl TransferConfig {
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_max_workers(mut self, n: usize) -> Self {
        self.max_workers = n;
        self
    }

    pub fn with_max_staging_requests(mut self, n: usize) -> Self {
        self.max_staging_requests = n;
        self
    }

    pub fn from_json(text: &str) -> Result<Self, TransferError> {
        let cfg: Self = serde_json::from_str(text).map_err(|e| TransferError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), TransferError> {
        if self.chunk_size == 0 || self.chunk_size > MAX_CHUNK_SIZE {
            return Err(TransferError::Config(format!(
                "chunk_size must be in 1..={MAX_CHUNK_SIZE}, got {}",
                self.chunk_size
            )));
        }
        for (name, v) in [("max_workers", self.max_workers), ("max_staging_requests", self.max_staging_requests)] {
            if v == 0 || v > MAX_CONCURRENCY_CAP {
                return Err(TransferError::Config(format!("{name} must be in 1..={MAX_CONCURRENCY_CAP}, got {v}")));
            }
        }
        if self.range_header.name.trim().is_empty() || self.range_header.unit.trim().is_empty() {
            return Err(TransferError::Config("range header name and unit must not be empty".into()));
        }
        Ok(())
    }
}

/// Worker count derived from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelismProfile {
    pub worker_count: usize,
}

impl ParallelismProfile {
    pub fn single_threaded() -> Self {
        Self { worker_count: 1 }
    }

    /// One worker per core minus one, capped at `hard_cap`, at least 1.
    pub fn dynamic(hard_cap: usize) -> Self {
        let cores = num_cpus::get();
        let worker_count = cores.saturating_sub(1).clamp(1, hard_cap.max(1));
        debug!(target: "obfs::config", cores, worker_count, "[PROFILE] dynamic parallelism");
        Self { worker_count }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let cfg = TransferConfig::from_json(r#"{"chunk_size": 4096}"#).unwrap();
        assert_eq!(cfg.chunk_size, 4096);
        assert_eq!(cfg.max_workers, MAX_WORKERS);
        assert_eq!(cfg.max_staging_requests, MAX_STAGING_REQ);
        assert_eq!(cfg.range_header.name, "Range");
    }

    #[test]
    fn zero_or_oversized_values_rejected() {
        assert!(TransferConfig::default().with_chunk_size(0).validate().is_err());
        assert!(TransferConfig::default().with_chunk_size(MAX_CHUNK_SIZE + 1).validate().is_err());
        assert!(TransferConfig::default().with_max_workers(0).validate().is_err());
        assert!(TransferConfig::default().with_max_staging_requests(MAX_CONCURRENCY_CAP + 1).validate().is_err());
    }

    #[test]
    fn dynamic_profile_respects_cap() {
        let p = ParallelismProfile::dynamic(2);
        assert!((1..=2).contains(&p.worker_count));
    }
}
