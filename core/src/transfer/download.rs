//! transfer/download.rs
//! Staging (bounded parallel range fetches) and ordered reassembly.
//!
//! Staging:
//! - `max_staging_requests` fetcher threads claim chunk indices in ascending
//!   order and fetch raw ranges; the control thread persists each result
//!   keyed by index as it arrives.
//! - Any failure stops claims, waits for running fetches, discards what was
//!   staged and returns one error.
//!
//! Reassembly:
//! - One deobfuscation task per staged chunk, at most `max_workers` at once.
//! - Results go through `OrderedAssembler`, so the sink sees strictly
//!   ascending indices whatever the completion order.
//! - Dispatch pauses while `max_workers` decoded chunks are waiting on a gap.
//! - `bytes_written != file_size` is reported on the result, not raised.

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use bytes::Bytes;
use crossbeam::channel::unbounded;
use tracing::{debug, info, warn};

use crate::chain::{ChainExecutor, ObfuscationConfig};
use crate::codec::Direction;
use crate::telemetry::{Stage, TelemetryTimer, TransferCounters, TransferSnapshot};
use crate::transfer::cancel::CancelToken;
use crate::transfer::chunk::{chunk_ranges, ByteRange, Chunk};
use crate::transfer::coordinator::TransferCoordinator;
use crate::transfer::ordered::OrderedAssembler;
use crate::transfer::progress::{ProgressFn, ProgressTracker, StagingStatus};
use crate::transfer::registry::TransferDirection;
use crate::transfer::staging::{StagedFile, StagingError, StagingStore};
use crate::transfer::transport::TransportError;
use crate::types::{IntegrityError, TransferError};
use crate::utils::chunk_count;
use crate::worker::{TaskOutcome, WorkerPool, WorkerTask};

/// Result of reassembling a staged file.
#[derive(Debug)]
pub struct Reassembled<W> {
    pub output: W,
    pub bytes_written: u64,
    /// Set when the output size does not match the staged file size. The
    /// output is kept; the caller should flag the file for retry.
    pub integrity: Option<IntegrityError>,
    pub snapshot: TransferSnapshot,
}

impl<W> Reassembled<W> {
    pub fn needs_retry(&self) -> bool {
        self.integrity.is_some()
    }
}

struct Fetched {
    index: u64,
    result: Result<Bytes, TransportError>,
    elapsed: std::time::Duration,
}

/// Control-thread bookkeeping for one reassembly.
struct ReassemblyState<'p, W: Write> {
    path: &'p str,
    counters: TransferCounters,
    timer: TelemetryTimer,
    tracker: ProgressTracker,
    assembler: OrderedAssembler<W>,
    failure: Option<TransferError>,
    in_flight: u64,
}

impl<W: Write> ReassemblyState<'_, W> {
    /// Returns the new progress percentage when a chunk reached the assembler.
    fn settle(&mut self, outcome: TaskOutcome) -> Option<f64> {
        self.in_flight -= 1;
        self.timer.stage_times.merge(&outcome.stage_times);
        let wire_len = outcome.input_len;

        let pushed = outcome.into_result().and_then(|(index, raw)| {
            let raw_len = raw.len();
            let start = Instant::now();
            self.assembler.push(index, raw)?;
            self.timer.add_stage_time(Stage::Write, start.elapsed());
            Ok(raw_len)
        });
        match pushed {
            Ok(raw_len) => {
                self.counters.add_completed(raw_len, wire_len);
                Some(self.tracker.advance(1))
            }
            Err(e) => {
                self.counters.add_failed();
                if self.failure.is_none() {
                    warn!(target: "obfs::reassemble", path = self.path, error = %e, "[REASSEMBLE] chunk failed");
                    self.failure = Some(e);
                }
                None
            }
        }
    }
}

impl TransferCoordinator {
    /// Fetch every chunk of `path` into `store`, still obfuscated.
    pub fn stage_chunks(
        &self,
        path: &str,
        file_size: u64,
        config: &ObfuscationConfig,
        store: &dyn StagingStore,
        cancel: &CancelToken,
        progress: ProgressFn<'_>,
    ) -> Result<TransferSnapshot, TransferError> {
        let _guard = self.registry.guard(path, TransferDirection::Down)?;
        self.stage_registered(path, file_size, config, store, cancel, progress)
    }

    /// Deobfuscate the staged chunks of `path` into `out` in index order.
    pub fn reassemble<W: Write>(
        &self,
        path: &str,
        store: &dyn StagingStore,
        out: W,
        cancel: &CancelToken,
        progress: ProgressFn<'_>,
    ) -> Result<Reassembled<W>, TransferError> {
        let _guard = self.registry.guard(path, TransferDirection::Down)?;
        self.reassemble_registered(path, store, out, cancel, progress)
    }

    /// Stage, reassemble, then drop the staged chunks.
    pub fn download<W: Write>(
        &self,
        path: &str,
        file_size: u64,
        config: &ObfuscationConfig,
        store: &dyn StagingStore,
        out: W,
        cancel: &CancelToken,
        progress: ProgressFn<'_>,
    ) -> Result<Reassembled<W>, TransferError> {
        let guard = self.registry.guard(path, TransferDirection::Down)?;
        self.stage_registered(path, file_size, config, store, cancel, &mut *progress)?;
        let result = self.reassemble_registered(path, store, out, cancel, progress)?;
        store.unstage(path)?;
        guard.release()?;
        Ok(result)
    }

    fn stage_registered(
        &self,
        path: &str,
        file_size: u64,
        config: &ObfuscationConfig,
        store: &dyn StagingStore,
        cancel: &CancelToken,
        progress: ProgressFn<'_>,
    ) -> Result<TransferSnapshot, TransferError> {
        ChainExecutor::compile(config)?;

        let chunk_size = self.settings.chunk_size as u64;
        let count = chunk_count(file_size, chunk_size);
        let ranges: Vec<ByteRange> = chunk_ranges(file_size, chunk_size).map(|(_, r)| r).collect();

        store.begin(StagedFile::new(path, config.clone(), file_size, chunk_size, count))?;
        info!(target: "obfs::staging", path, file_size, chunks = count, "[STAGING] starting");

        let mut counters = TransferCounters::new(count);
        let mut timer = TelemetryTimer::new();
        let mut tracker = ProgressTracker::new(file_size);
        let mut failure: Option<TransferError> = None;

        let next = AtomicU64::new(0);
        let stop = AtomicBool::new(false);
        let in_flight = AtomicU64::new(0);
        let fetchers = self.settings.max_staging_requests.min(count as usize).max(1);
        let (tx, rx) = unbounded::<Fetched>();

        thread::scope(|scope| {
            for _ in 0..fetchers {
                let tx = tx.clone();
                let (next, stop, in_flight, ranges) = (&next, &stop, &in_flight, &ranges);
                let transport = Arc::clone(&self.transport);
                scope.spawn(move || loop {
                    if stop.load(Ordering::SeqCst) {
                        break;
                    }
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    let Some(range) = ranges.get(index as usize).copied() else { break };
                    in_flight.fetch_add(1, Ordering::SeqCst);
                    let start = Instant::now();
                    let result = transport.fetch_chunk(path, range);
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    if tx.send(Fetched { index, result, elapsed: start.elapsed() }).is_err() {
                        break;
                    }
                });
            }
            drop(tx);

            for fetched in rx.iter() {
                timer.add_stage_time(Stage::Fetch, fetched.elapsed);
                if failure.is_some() {
                    continue;
                }
                if cancel.is_cancelled() {
                    stop.store(true, Ordering::SeqCst);
                    failure = Some(TransferError::Cancelled { path: path.to_string() });
                    continue;
                }
                counters.add_dispatched(in_flight.load(Ordering::SeqCst) + 1);
                let range = ranges[fetched.index as usize];
                let stored = fetched
                    .result
                    .map_err(TransferError::from)
                    .and_then(|wire| {
                        let wire_len = wire.len();
                        store.put_chunk(path, fetched.index, wire)?;
                        Ok(wire_len)
                    });
                match stored {
                    Ok(wire_len) => {
                        counters.add_completed(range.len() as usize, wire_len);
                        progress(Some(tracker.advance(range.len())));
                    }
                    Err(e) => {
                        counters.add_failed();
                        warn!(target: "obfs::staging", path, index = fetched.index, error = %e,
                            "[STAGING] chunk failed, halting fetches");
                        stop.store(true, Ordering::SeqCst);
                        failure = Some(e);
                    }
                }
            }
        });

        timer.finish();
        let snapshot = TransferSnapshot::from(path, &counters, &timer);
        progress(None);

        if let Some(err) = failure {
            if let Err(e) = store.unstage(path) {
                warn!(target: "obfs::staging", path, error = %e, "[STAGING] discard failed");
            }
            return Err(err);
        }

        store.set_status(path, StagingStatus::Staged)?;
        info!(target: "obfs::staging", path, chunks = count, "[STAGING] staged");
        Ok(snapshot)
    }

    fn reassemble_registered<W: Write>(
        &self,
        path: &str,
        store: &dyn StagingStore,
        out: W,
        cancel: &CancelToken,
        progress: ProgressFn<'_>,
    ) -> Result<Reassembled<W>, TransferError> {
        let record = store.record(path)?;
        if !record.is_staged() {
            return Err(StagingError::NotStaged { path: path.to_string() }.into());
        }
        store.set_status(path, StagingStatus::Saving)?;
        debug!(target: "obfs::reassemble", path, chunks = record.chunk_count, "[REASSEMBLE] starting");

        let config = Arc::new(record.config.clone());
        let ranges: Vec<ByteRange> =
            chunk_ranges(record.file_size, record.chunk_size).map(|(_, r)| r).collect();

        let mut state = ReassemblyState {
            path,
            counters: TransferCounters::new(record.chunk_count),
            timer: TelemetryTimer::new(),
            tracker: ProgressTracker::new(record.chunk_count),
            assembler: OrderedAssembler::new(out),
            failure: None,
            in_flight: 0,
        };

        let pool = WorkerPool::new(self.settings.max_workers)?;
        let (reply_tx, reply_rx) = unbounded::<TaskOutcome>();

        for (index, range) in ranges.iter().enumerate() {
            let index = index as u64;
            if cancel.is_cancelled() {
                state.failure.get_or_insert(TransferError::Cancelled { path: path.to_string() });
                break;
            }
            // Hold dispatch while decoded chunks pile up behind a slow lower index.
            while state.failure.is_none()
                && state.in_flight > 0
                && state.assembler.pending() >= self.settings.max_workers
            {
                match reply_rx.recv() {
                    Ok(outcome) => {
                        if let Some(pct) = state.settle(outcome) {
                            progress(Some(pct));
                        }
                    }
                    Err(_) => {
                        state.failure = Some(TransferError::WorkerDisconnected);
                    }
                }
            }
            let permit = match pool.acquire() {
                Ok(p) => p,
                Err(e) => {
                    state.failure.get_or_insert(e);
                    break;
                }
            };
            for outcome in reply_rx.try_iter() {
                if let Some(pct) = state.settle(outcome) {
                    progress(Some(pct));
                }
            }
            if state.failure.is_some() {
                break;
            }

            let wire = match store.get_chunk(path, index) {
                Ok(w) => w,
                Err(StagingError::MissingChunk { index, .. }) => {
                    state.failure = Some(IntegrityError::MissingChunk { index }.into());
                    break;
                }
                Err(e) => {
                    state.failure = Some(e.into());
                    break;
                }
            };
            let task = WorkerTask::new(Chunk::new(index, *range, wire), Arc::clone(&config), Direction::Deobfuscate);
            if let Err(e) = pool.dispatch_with(permit, task, &reply_tx) {
                state.failure = Some(e);
                break;
            }
            state.in_flight += 1;
            state.counters.add_dispatched(pool.stats().in_flight);
        }

        while state.in_flight > 0 {
            match reply_rx.recv() {
                Ok(outcome) => {
                    if let Some(pct) = state.settle(outcome) {
                        progress(Some(pct));
                    }
                }
                Err(_) => {
                    state.failure.get_or_insert(TransferError::WorkerDisconnected);
                    break;
                }
            }
        }
        state.counters.peak_in_flight = state.counters.peak_in_flight.max(pool.stats().peak_in_flight);
        drop(pool);
        progress(None);

        let ReassemblyState { counters, mut timer, assembler, failure, .. } = state;
        if let Some(err) = failure {
            warn!(target: "obfs::reassemble", path, error = %err, "[REASSEMBLE] aborted, discarding staged chunks");
            if let Err(e) = store.unstage(path) {
                warn!(target: "obfs::reassemble", path, error = %e, "[REASSEMBLE] discard failed");
            }
            return Err(err);
        }

        let (output, bytes_written) = assembler.finish()?;
        timer.finish();
        let snapshot = TransferSnapshot::from(path, &counters, &timer);
        store.set_status(path, StagingStatus::Staged)?;

        let integrity = (bytes_written != record.file_size).then(|| {
            warn!(target: "obfs::reassemble", path, expected = record.file_size, actual = bytes_written,
                "[REASSEMBLE] size mismatch, flag for retry");
            IntegrityError::SizeMismatch { expected: record.file_size, actual: bytes_written }
        });
        info!(target: "obfs::reassemble", path, bytes_written, "[REASSEMBLE] finished");

        Ok(Reassembled { output, bytes_written, integrity, snapshot })
    }
}
