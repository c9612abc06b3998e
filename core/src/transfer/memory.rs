//! transfer/memory.rs
//! In-process cooperating endpoint.
//!
//! Holds payloads in memory in plain form. Uploaded chunks are deobfuscated
//! with the config announced in `begin_transfer` and written at their byte
//! offset; fetched ranges are obfuscated with the endpoint's own config.
//! Useful as the server half in tests and local tooling.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use tracing::{debug, info};

use crate::chain::{ChainExecutor, ObfuscationConfig};
use crate::transfer::chunk::ByteRange;
use crate::transfer::transport::{Transport, TransportError};

struct PendingUpload {
    chain: Arc<ChainExecutor>,
    buffer: Vec<u8>,
}

#[derive(Default)]
struct State {
    files: HashMap<String, Bytes>,
    uploads: HashMap<String, PendingUpload>,
}

/// Call counters, for asserting on the lifecycle a coordinator drove.
#[derive(Debug, Default)]
pub struct TransportCalls {
    pub fetch: AtomicUsize,
    pub put: AtomicUsize,
    pub cancel: AtomicUsize,
    pub finish: AtomicUsize,
}

impl TransportCalls {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

pub struct MemoryTransport {
    serve_chain: ChainExecutor,
    state: Mutex<State>,
    pub calls: TransportCalls,
}

impl MemoryTransport {
    /// `serve_config` obfuscates every range handed out by `fetch_chunk`.
    pub fn new(serve_config: &ObfuscationConfig) -> Result<Self, TransportError> {
        let serve_chain = ChainExecutor::compile(serve_config)
            .map_err(|e| TransportError::request("<serve config>", e.to_string()))?;
        Ok(Self { serve_chain, state: Mutex::new(State::default()), calls: TransportCalls::default() })
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store a payload directly, as if it had been uploaded earlier.
    pub fn insert_file(&self, path: &str, data: impl Into<Bytes>) {
        self.state().files.insert(path.to_string(), data.into());
    }

    pub fn file(&self, path: &str) -> Option<Bytes> {
        self.state().files.get(path).cloned()
    }

    pub fn has_pending_upload(&self, path: &str) -> bool {
        self.state().uploads.contains_key(path)
    }

    pub fn file_size(&self, path: &str) -> Option<u64> {
        self.state().files.get(path).map(|f| f.len() as u64)
    }
}

impl Transport for MemoryTransport {
    fn begin_transfer(&self, path: &str, config: &ObfuscationConfig) -> Result<(), TransportError> {
        let chain = ChainExecutor::compile(config)
            .map_err(|e| TransportError::Rejected { path: path.to_string(), reason: e.to_string() })?;
        let mut state = self.state();
        if state.uploads.contains_key(path) || state.files.contains_key(path) {
            return Err(TransportError::AlreadyExists { path: path.to_string() });
        }
        state.uploads.insert(path.to_string(), PendingUpload { chain: Arc::new(chain), buffer: Vec::new() });
        debug!(target: "obfs::memory", path, "[SERVER] upload registered");
        Ok(())
    }

    fn fetch_chunk(&self, path: &str, range: ByteRange) -> Result<Bytes, TransportError> {
        self.calls.fetch.fetch_add(1, Ordering::SeqCst);
        let file = self
            .state()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| TransportError::NotFound { path: path.to_string() })?;

        let size = file.len() as u64;
        if range.start > range.end || range.end > size {
            return Err(TransportError::RangeOutOfBounds { path: path.to_string(), range, size });
        }
        let raw = file.slice(range.start as usize..range.end as usize);
        let wire = self
            .serve_chain
            .obfuscate(&raw)
            .map_err(|e| TransportError::request(path, e.to_string()))?;
        Ok(Bytes::from(wire))
    }

    fn put_chunk(&self, path: &str, range: ByteRange, data: Bytes) -> Result<(), TransportError> {
        self.calls.put.fetch_add(1, Ordering::SeqCst);
        let chain = self
            .state()
            .uploads
            .get(path)
            .map(|upload| Arc::clone(&upload.chain))
            .ok_or_else(|| TransportError::UnknownTransfer { path: path.to_string() })?;

        // Decode outside the lock so concurrent puts overlap.
        let raw = chain
            .deobfuscate(&data)
            .map_err(|e| TransportError::Rejected { path: path.to_string(), reason: e.to_string() })?;
        if raw.len() as u64 != range.len() {
            return Err(TransportError::Rejected {
                path: path.to_string(),
                reason: format!("chunk {range} decoded to {} bytes", raw.len()),
            });
        }

        let mut state = self.state();
        let upload = state
            .uploads
            .get_mut(path)
            .ok_or_else(|| TransportError::UnknownTransfer { path: path.to_string() })?;
        let start = range.start as usize;
        let end = start + raw.len();
        if upload.buffer.len() < end {
            upload.buffer.resize(end, 0);
        }
        upload.buffer[start..end].copy_from_slice(&raw);
        Ok(())
    }

    fn cancel_transfer(&self, path: &str) -> Result<(), TransportError> {
        self.calls.cancel.fetch_add(1, Ordering::SeqCst);
        self.state()
            .uploads
            .remove(path)
            .map(|_| info!(target: "obfs::memory", path, "[SERVER] partial upload removed"))
            .ok_or_else(|| TransportError::UnknownTransfer { path: path.to_string() })
    }

    fn finish_transfer(&self, path: &str) -> Result<(), TransportError> {
        self.calls.finish.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state();
        let upload = state
            .uploads
            .remove(path)
            .ok_or_else(|| TransportError::UnknownTransfer { path: path.to_string() })?;
        state.files.insert(path.to_string(), Bytes::from(upload.buffer));
        info!(target: "obfs::memory", path, "[SERVER] upload committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Direction;

    #[test]
    fn fetched_range_deobfuscates_to_slice() {
        let t = MemoryTransport::new(&ObfuscationConfig::empty()).unwrap();
        t.insert_file("/a", &b"0123456789"[..]);
        let wire = t.fetch_chunk("/a", ByteRange::new(2, 3)).unwrap();
        let chain = ChainExecutor::compile(&ObfuscationConfig::empty()).unwrap();
        assert_eq!(chain.run(Direction::Deobfuscate, &wire).unwrap(), b"234");
    }

    #[test]
    fn put_requires_begin_and_cancel_discards() {
        let t = MemoryTransport::new(&ObfuscationConfig::empty()).unwrap();
        let wire = Bytes::from(ChainExecutor::compile(&ObfuscationConfig::empty()).unwrap().obfuscate(b"ab").unwrap());
        assert!(matches!(
            t.put_chunk("/b", ByteRange::new(0, 2), wire.clone()),
            Err(TransportError::UnknownTransfer { .. })
        ));

        t.begin_transfer("/b", &ObfuscationConfig::empty()).unwrap();
        t.put_chunk("/b", ByteRange::new(0, 2), wire).unwrap();
        t.cancel_transfer("/b").unwrap();
        assert!(!t.has_pending_upload("/b"));
        assert!(t.file("/b").is_none());
    }

    #[test]
    fn concurrent_puts_assemble_at_offsets() {
        let config = ObfuscationConfig::new(vec![crate::chain::ObfuscatorSpec::new(crate::codec::Algorithm::Deflate)]);
        let t = MemoryTransport::new(&ObfuscationConfig::empty()).unwrap();
        t.begin_transfer("/p", &config).unwrap();
        let chain = ChainExecutor::compile(&config).unwrap();

        std::thread::scope(|s| {
            for i in 0..8u64 {
                let (t, chain) = (&t, &chain);
                s.spawn(move || {
                    let raw = vec![i as u8; 16];
                    let wire = Bytes::from(chain.obfuscate(&raw).unwrap());
                    t.put_chunk("/p", ByteRange::new(i * 16, 16), wire).unwrap();
                });
            }
        });
        t.finish_transfer("/p").unwrap();

        let expected: Vec<u8> = (0..8u8).flat_map(|i| vec![i; 16]).collect();
        assert_eq!(t.file("/p").unwrap(), expected);
        assert_eq!(TransportCalls::get(&t.calls.put), 8);
    }
}
