//! transfer/upload.rs
//! Chunked, worker-parallel upload.
//!
//! Flow:
//! 1. Compile the config (parameter errors surface before anything starts).
//! 2. Register `(path, up)` and announce the upload to the transport.
//! 3. For each chunk in ascending order: wait for a free worker slot, then
//!    dispatch "obfuscate, then put at the chunk's byte range" to the pool.
//!    Completion order is free; every put carries its own range.
//! 4. First failure (or cancellation) stops dispatch. In-flight chunks
//!    settle, the transport gets exactly one cancel, one error is returned.
//! 5. Success: finish on the transport, progress `None`.
//!
//! The registration is released on every path out of `upload`.

use std::sync::Arc;

use bytes::Bytes;
use crossbeam::channel::unbounded;
use tracing::{debug, info, warn};

use crate::chain::{ChainExecutor, ObfuscationConfig};
use crate::codec::Direction;
use crate::telemetry::{TelemetryTimer, TransferCounters, TransferSnapshot};
use crate::transfer::cancel::CancelToken;
use crate::transfer::chunk::partition;
use crate::transfer::coordinator::TransferCoordinator;
use crate::transfer::progress::{ProgressFn, ProgressTracker};
use crate::transfer::registry::{TransferDirection, TransferGuard};
use crate::types::TransferError;
use crate::worker::{TaskOutcome, WorkerPool, WorkerTask};

/// Control-thread bookkeeping for one upload.
struct UploadState<'g> {
    guard: TransferGuard<'g>,
    counters: TransferCounters,
    timer: TelemetryTimer,
    tracker: ProgressTracker,
    failure: Option<TransferError>,
    in_flight: u64,
}

impl UploadState<'_> {
    /// Returns the new progress percentage when the chunk succeeded.
    fn settle(&mut self, outcome: TaskOutcome) -> Option<f64> {
        self.in_flight -= 1;
        self.guard.mark_settled(outcome.index);
        self.timer.stage_times.merge(&outcome.stage_times);

        let raw_len = outcome.input_len;
        match outcome.into_result() {
            Ok((_, wire)) => {
                self.counters.add_completed(raw_len, wire.len());
                Some(self.tracker.advance(raw_len as u64))
            }
            Err(err) => {
                self.counters.add_failed();
                if self.failure.is_none() {
                    warn!(target: "obfs::upload", path = self.guard.path(), error = %err,
                        "[UPLOAD] chunk failed, halting dispatch");
                    self.failure = Some(err);
                } else {
                    debug!(target: "obfs::upload", path = self.guard.path(), error = %err,
                        "[UPLOAD] additional chunk failure");
                }
                None
            }
        }
    }
}

impl TransferCoordinator {
    /// Obfuscate and upload `payload` to `path`, chunk by chunk.
    pub fn upload(
        &self,
        path: &str,
        payload: Bytes,
        config: &ObfuscationConfig,
        cancel: &CancelToken,
        progress: ProgressFn<'_>,
    ) -> Result<TransferSnapshot, TransferError> {
        ChainExecutor::compile(config)?;

        let guard = self.registry.guard(path, TransferDirection::Up)?;
        let chunks = partition(&payload, self.settings.chunk_size as u64);
        info!(target: "obfs::upload", path, size = payload.len(), chunks = chunks.len(),
            "[UPLOAD] starting");

        self.transport.begin_transfer(path, config)?;

        let mut state = UploadState {
            guard,
            counters: TransferCounters::new(chunks.len() as u64),
            timer: TelemetryTimer::new(),
            tracker: ProgressTracker::new(payload.len() as u64),
            failure: None,
            in_flight: 0,
        };

        let pool = WorkerPool::new(self.settings.max_workers)?;
        let config = Arc::new(config.clone());
        let (reply_tx, reply_rx) = unbounded::<TaskOutcome>();

        for chunk in chunks {
            if cancel.is_cancelled() {
                state.failure.get_or_insert(TransferError::Cancelled { path: path.to_string() });
                break;
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
            if cancel.is_cancelled() {
                state.failure = Some(TransferError::Cancelled { path: path.to_string() });
                break;
            }

            let index = chunk.index;
            let transport = Arc::clone(&self.transport);
            let target = path.to_string();
            let task = WorkerTask::new(chunk, Arc::clone(&config), Direction::Obfuscate)
                .with_completion(move |chunk, wire| transport.put_chunk(&target, chunk.range, wire));

            state.guard.mark_in_flight(index);
            if let Err(e) = pool.dispatch_with(permit, task, &reply_tx) {
                state.guard.mark_settled(index);
                state.failure = Some(e);
                break;
            }
            state.in_flight += 1;
            state.counters.add_dispatched(pool.stats().in_flight);
        }

        // Let everything already dispatched settle before touching the transport.
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

        let UploadState { guard, counters, mut timer, failure, .. } = state;
        timer.finish();
        let snapshot = TransferSnapshot::from(path, &counters, &timer);

        match failure {
            None => {
                let finished = self.transport.finish_transfer(path);
                if let Err(finish_err) = &finished {
                    warn!(target: "obfs::upload", path, error = %finish_err,
                        "[UPLOAD] finish failed, cancelling partial upload");
                    if let Err(cancel_err) = self.transport.cancel_transfer(path) {
                        warn!(target: "obfs::upload", path, error = %cancel_err, "[UPLOAD] cancel failed");
                    }
                }
                progress(None);
                guard.release()?;
                finished?;
                info!(target: "obfs::upload", path, chunks = counters.chunks_completed,
                    elapsed_ms = snapshot.elapsed.as_millis() as u64, "[UPLOAD] finished");
                Ok(snapshot)
            }
            Some(err) => {
                if let Err(cancel_err) = self.transport.cancel_transfer(path) {
                    warn!(target: "obfs::upload", path, error = %cancel_err, "[UPLOAD] cancel failed");
                }
                progress(None);
                drop(guard);
                warn!(target: "obfs::upload", path, error = %err,
                    completed = counters.chunks_completed, "[UPLOAD] aborted");
                Err(err)
            }
        }
    }
}
