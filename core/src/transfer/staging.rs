//! transfer/staging.rs
//! Local persistence for downloaded chunks that are still obfuscated.
//!
//! A staged file is a record (`StagedFile`) plus one blob per chunk index.
//! The record carries the config the chunks were fetched under, so a later
//! reassembly decodes them correctly even if the live config has changed.
//!
//! Backends:
//! - `MemoryStagingStore`: process memory.
//! - `DirStagingStore`: one directory per staged path, named by the BLAKE3
//!   hex digest of the path; each chunk file ends with a CRC32 trailer that
//!   is verified on load.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::chain::ObfuscationConfig;
use crate::transfer::progress::StagingStatus;

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("staging I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{path} is not staged")]
    NotStaged { path: String },

    #[error("chunk {index} of {path} is not staged")]
    MissingChunk { path: String, index: u64 },

    #[error("chunk {index} of {path} is corrupt (crc {actual:08x} != {expected:08x})")]
    Corrupt { path: String, index: u64, expected: u32, actual: u32 },

    #[error("staging record for {path} is unreadable: {reason}")]
    Record { path: String, reason: String },
}

/// Store name for a path: BLAKE3 hex digest of the path string.
pub fn store_name(path: &str) -> String {
    blake3::hash(path.as_bytes()).to_hex().to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedFile {
    pub path: String,
    pub name: String,
    pub status: StagingStatus,
    pub config: ObfuscationConfig,
    pub file_size: u64,
    pub chunk_size: u64,
    pub chunk_count: u64,
    pub created_at: DateTime<Utc>,
}

impl StagedFile {
    pub fn new(path: &str, config: ObfuscationConfig, file_size: u64, chunk_size: u64, chunk_count: u64) -> Self {
        Self {
            path: path.to_string(),
            name: store_name(path),
            status: StagingStatus::Staging,
            config,
            file_size,
            chunk_size,
            chunk_count,
            created_at: Utc::now(),
        }
    }

    /// All chunks are present and the file can be reassembled.
    pub fn is_staged(&self) -> bool {
        self.status == StagingStatus::Staged
    }
}

pub trait StagingStore: Send + Sync {
    /// Start staging `record.path`, replacing anything staged there before.
    fn begin(&self, record: StagedFile) -> Result<(), StagingError>;

    fn put_chunk(&self, path: &str, index: u64, data: Bytes) -> Result<(), StagingError>;

    fn get_chunk(&self, path: &str, index: u64) -> Result<Bytes, StagingError>;

    fn record(&self, path: &str) -> Result<StagedFile, StagingError>;

    fn set_status(&self, path: &str, status: StagingStatus) -> Result<(), StagingError>;

    /// Delete the record and every chunk. Returns whether anything existed.
    fn unstage(&self, path: &str) -> Result<bool, StagingError>;

    fn staged_paths(&self) -> Result<Vec<String>, StagingError>;

    fn status(&self, path: &str) -> StagingStatus {
        self.record(path).map(|r| r.status).unwrap_or(StagingStatus::Unstaged)
    }
}

// ---- In-memory backend ----

#[derive(Debug, Default)]
pub struct MemoryStagingStore {
    files: Mutex<HashMap<String, (StagedFile, BTreeMap<u64, Bytes>)>>,
}

impl MemoryStagingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn files(&self) -> MutexGuard<'_, HashMap<String, (StagedFile, BTreeMap<u64, Bytes>)>> {
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn chunk_count(&self, path: &str) -> usize {
        self.files().get(path).map(|(_, c)| c.len()).unwrap_or(0)
    }
}

fn not_staged(path: &str) -> StagingError {
    StagingError::NotStaged { path: path.to_string() }
}

impl StagingStore for MemoryStagingStore {
    fn begin(&self, record: StagedFile) -> Result<(), StagingError> {
        self.files().insert(record.path.clone(), (record, BTreeMap::new()));
        Ok(())
    }

    fn put_chunk(&self, path: &str, index: u64, data: Bytes) -> Result<(), StagingError> {
        let mut files = self.files();
        let (_, chunks) = files.get_mut(path).ok_or_else(|| not_staged(path))?;
        chunks.insert(index, data);
        Ok(())
    }

    fn get_chunk(&self, path: &str, index: u64) -> Result<Bytes, StagingError> {
        let files = self.files();
        let (_, chunks) = files.get(path).ok_or_else(|| not_staged(path))?;
        chunks
            .get(&index)
            .cloned()
            .ok_or_else(|| StagingError::MissingChunk { path: path.to_string(), index })
    }

    fn record(&self, path: &str) -> Result<StagedFile, StagingError> {
        self.files().get(path).map(|(r, _)| r.clone()).ok_or_else(|| not_staged(path))
    }

    fn set_status(&self, path: &str, status: StagingStatus) -> Result<(), StagingError> {
        let mut files = self.files();
        let (record, _) = files.get_mut(path).ok_or_else(|| not_staged(path))?;
        record.status = status;
        Ok(())
    }

    fn unstage(&self, path: &str) -> Result<bool, StagingError> {
        Ok(self.files().remove(path).is_some())
    }

    fn staged_paths(&self) -> Result<Vec<String>, StagingError> {
        let mut paths: Vec<String> = self.files().keys().cloned().collect();
        paths.sort();
        Ok(paths)
    }
}

// ---- Directory backend ----

const RECORD_FILE: &str = "record.json";
const CRC_LEN: usize = 4;

#[derive(Debug, Clone)]
pub struct DirStagingStore {
    root: PathBuf,
}

impl DirStagingStore {
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StagingError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn dir(&self, path: &str) -> PathBuf {
        self.root.join(store_name(path))
    }

    fn chunk_file(&self, path: &str, index: u64) -> PathBuf {
        self.dir(path).join(format!("chunk-{index:08}.bin"))
    }

    fn write_record(&self, record: &StagedFile) -> Result<(), StagingError> {
        let json = serde_json::to_vec_pretty(record)
            .map_err(|e| StagingError::Record { path: record.path.clone(), reason: e.to_string() })?;
        fs::write(self.dir(&record.path).join(RECORD_FILE), json)?;
        Ok(())
    }
}

impl StagingStore for DirStagingStore {
    fn begin(&self, record: StagedFile) -> Result<(), StagingError> {
        let dir = self.dir(&record.path);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        fs::create_dir_all(&dir)?;
        self.write_record(&record)?;
        debug!(target: "obfs::staging", path = %record.path, dir = %dir.display(), "[STAGING] begin");
        Ok(())
    }

    fn put_chunk(&self, path: &str, index: u64, data: Bytes) -> Result<(), StagingError> {
        if !self.dir(path).join(RECORD_FILE).exists() {
            return Err(not_staged(path));
        }
        let mut blob = Vec::with_capacity(data.len() + CRC_LEN);
        blob.extend_from_slice(&data);
        blob.extend_from_slice(&crc32fast::hash(&data).to_le_bytes());
        fs::write(self.chunk_file(path, index), blob)?;
        Ok(())
    }

    fn get_chunk(&self, path: &str, index: u64) -> Result<Bytes, StagingError> {
        let blob = match fs::read(self.chunk_file(path, index)) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StagingError::MissingChunk { path: path.to_string(), index })
            }
            Err(e) => return Err(e.into()),
        };
        if blob.len() < CRC_LEN {
            return Err(StagingError::Corrupt { path: path.to_string(), index, expected: 0, actual: 0 });
        }
        let (data, trailer) = blob.split_at(blob.len() - CRC_LEN);
        let expected = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
        let actual = crc32fast::hash(data);
        if expected != actual {
            warn!(target: "obfs::staging", path, index, "[STAGING] crc mismatch");
            return Err(StagingError::Corrupt { path: path.to_string(), index, expected, actual });
        }
        Ok(Bytes::copy_from_slice(data))
    }

    fn record(&self, path: &str) -> Result<StagedFile, StagingError> {
        let bytes = match fs::read(self.dir(path).join(RECORD_FILE)) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(not_staged(path)),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes)
            .map_err(|e| StagingError::Record { path: path.to_string(), reason: e.to_string() })
    }

    fn set_status(&self, path: &str, status: StagingStatus) -> Result<(), StagingError> {
        let mut record = self.record(path)?;
        record.status = status;
        self.write_record(&record)
    }

    fn unstage(&self, path: &str) -> Result<bool, StagingError> {
        let dir = self.dir(path);
        if !dir.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(&dir)?;
        debug!(target: "obfs::staging", path, "[STAGING] unstaged");
        Ok(true)
    }

    fn staged_paths(&self) -> Result<Vec<String>, StagingError> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let record_path = entry?.path().join(RECORD_FILE);
            if let Ok(bytes) = fs::read(&record_path) {
                if let Ok(record) = serde_json::from_slice::<StagedFile>(&bytes) {
                    paths.push(record.path);
                }
            }
        }
        paths.sort();
        Ok(paths)
    }
}
