//! worker/pool.rs
//! Fixed-size worker pool with a dispatch permit per in-flight task.
//!
//! Design:
//! - N named threads pull jobs from one crossbeam channel.
//! - Each thread compiles the chain for a config once and reuses it for
//!   following tasks with the same config. Nothing mutable is shared
//!   between threads.
//! - A bounded channel pre-filled with N tokens is the semaphore. `acquire`
//!   takes a token; the worker returns it after the outcome is sent, so a
//!   caller that got a permit can already see the outcome that freed it.
//! - Panics inside a task are caught and reported as `TaskError::Panicked`.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use bytes::Bytes;
use crossbeam::channel::{bounded, unbounded, Receiver, Sender};
use serde::Serialize;
use tracing::{debug, error, trace};

use crate::chain::{ChainExecutor, ObfuscationConfig};
use crate::codec::{CodecError, Direction};
use crate::telemetry::{Stage, StageTimes};
use crate::types::TransferError;
use crate::worker::types::{TaskError, TaskOutcome, WorkerTask};

#[derive(Debug, Default)]
struct PoolCounters {
    in_flight: AtomicU64,
    peak_in_flight: AtomicU64,
    dispatched: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub in_flight: u64,
    pub peak_in_flight: u64,
    pub dispatched: u64,
    pub succeeded: u64,
    pub failed: u64,
}

/// One dispatch slot. Returned to the pool on drop.
pub struct Permit {
    slot_tx: Sender<()>,
    counters: Arc<PoolCounters>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
        // Capacity equals the number of permits, so this never blocks.
        let _ = self.slot_tx.send(());
    }
}

struct Job {
    task: WorkerTask,
    reply: Sender<TaskOutcome>,
    permit: Permit,
}

/// Promise-style handle for a single submitted task.
pub struct TaskHandle {
    index: u64,
    rx: Receiver<TaskOutcome>,
}

impl TaskHandle {
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Block until the task settles.
    pub fn wait(self) -> Result<Bytes, TransferError> {
        let outcome = self.rx.recv().map_err(|_| TransferError::WorkerDisconnected)?;
        outcome.into_result().map(|(_, bytes)| bytes)
    }
}

pub struct WorkerPool {
    job_tx: Option<Sender<Job>>,
    slot_tx: Sender<()>,
    slot_rx: Receiver<()>,
    handles: Vec<JoinHandle<()>>,
    counters: Arc<PoolCounters>,
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Result<Self, TransferError> {
        if size == 0 {
            return Err(TransferError::Config("worker pool needs at least one worker".into()));
        }

        let (job_tx, job_rx) = unbounded::<Job>();
        let (slot_tx, slot_rx) = bounded::<()>(size);
        for _ in 0..size {
            slot_tx.send(()).map_err(|_| TransferError::WorkerDisconnected)?;
        }

        let counters = Arc::new(PoolCounters::default());
        let mut handles = Vec::with_capacity(size);
        for id in 0..size {
            let rx = job_rx.clone();
            let counters = Arc::clone(&counters);
            let handle = thread::Builder::new()
                .name(format!("obfs-worker-{id}"))
                .spawn(move || worker_loop(id, rx, counters))?;
            handles.push(handle);
        }
        debug!(target: "obfs::pool", size, "[POOL] started");

        Ok(Self { job_tx: Some(job_tx), slot_tx, slot_rx, handles, counters, size })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn stats(&self) -> PoolStats {
        let c = &self.counters;
        PoolStats {
            in_flight: c.in_flight.load(Ordering::SeqCst),
            peak_in_flight: c.peak_in_flight.load(Ordering::SeqCst),
            dispatched: c.dispatched.load(Ordering::SeqCst),
            succeeded: c.succeeded.load(Ordering::SeqCst),
            failed: c.failed.load(Ordering::SeqCst),
        }
    }

    fn permit(&self) -> Permit {
        let now = self.counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        Permit { slot_tx: self.slot_tx.clone(), counters: Arc::clone(&self.counters) }
    }

    /// Block until fewer than `size` tasks are in flight.
    pub fn acquire(&self) -> Result<Permit, TransferError> {
        self.slot_rx.recv().map_err(|_| TransferError::WorkerDisconnected)?;
        Ok(self.permit())
    }

    pub fn try_acquire(&self) -> Option<Permit> {
        self.slot_rx.try_recv().ok().map(|_| self.permit())
    }

    /// Hand `task` to a worker under an already-held permit.
    pub fn dispatch_with(
        &self,
        permit: Permit,
        task: WorkerTask,
        reply: &Sender<TaskOutcome>,
    ) -> Result<(), TransferError> {
        let job_tx = self.job_tx.as_ref().ok_or(TransferError::WorkerDisconnected)?;
        trace!(target: "obfs::pool", index = task.chunk.index, direction = %task.direction, "[POOL] dispatch");
        job_tx
            .send(Job { task, reply: reply.clone(), permit })
            .map_err(|_| TransferError::WorkerDisconnected)?;
        self.counters.dispatched.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Wait for a free slot, then dispatch. Outcome arrives on `reply`.
    pub fn dispatch(&self, task: WorkerTask, reply: &Sender<TaskOutcome>) -> Result<(), TransferError> {
        let permit = self.acquire()?;
        self.dispatch_with(permit, task, reply)
    }

    /// Dispatch and return a handle to wait on this one task.
    pub fn submit(&self, task: WorkerTask) -> Result<TaskHandle, TransferError> {
        let index = task.chunk.index;
        let (tx, rx) = bounded(1);
        self.dispatch(task, &tx)?;
        Ok(TaskHandle { index, rx })
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the job channel ends every worker loop.
        drop(self.job_tx.take());
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                error!(target: "obfs::pool", "[POOL] worker thread exited by panic");
            }
        }
    }
}

type PlanCache = Option<(Arc<ObfuscationConfig>, ChainExecutor)>;

fn worker_loop(id: usize, rx: Receiver<Job>, counters: Arc<PoolCounters>) {
    let mut cache: PlanCache = None;

    while let Ok(Job { task, reply, permit }) = rx.recv() {
        let index = task.chunk.index;
        let range = task.chunk.range;
        let input_len = task.chunk.data.len();

        let outcome = match catch_unwind(AssertUnwindSafe(|| run_task(&mut cache, task))) {
            Ok(outcome) => outcome,
            Err(payload) => {
                cache = None;
                let msg = panic_message(payload.as_ref());
                error!(target: "obfs::pool", worker = id, index, %msg, "[POOL] task panicked");
                TaskOutcome {
                    index,
                    range,
                    input_len,
                    result: Err(TaskError::Panicked(msg)),
                    stage_times: StageTimes::default(),
                }
            }
        };

        let counter = if outcome.is_ok() { &counters.succeeded } else { &counters.failed };
        counter.fetch_add(1, Ordering::SeqCst);

        if reply.send(outcome).is_err() {
            trace!(target: "obfs::pool", worker = id, index, "[POOL] reply receiver gone");
        }
        drop(permit);
    }
    trace!(target: "obfs::pool", worker = id, "[POOL] worker exiting");
}

fn run_task(cache: &mut PlanCache, task: WorkerTask) -> TaskOutcome {
    let WorkerTask { chunk, config, direction, on_complete } = task;
    let mut stage_times = StageTimes::default();

    let result = (|| -> Result<Bytes, TaskError> {
        let chain = cached_chain(cache, &config)?;

        let start = Instant::now();
        let out = Bytes::from(chain.run(direction, &chunk.data)?);
        let stage = match direction {
            Direction::Obfuscate => Stage::Obfuscate,
            Direction::Deobfuscate => Stage::Deobfuscate,
        };
        stage_times.add(stage, start.elapsed());

        if let Some(complete) = on_complete {
            let start = Instant::now();
            complete(&chunk, out.clone())?;
            stage_times.add(Stage::Put, start.elapsed());
        }
        Ok(out)
    })();

    TaskOutcome {
        index: chunk.index,
        range: chunk.range,
        input_len: chunk.data.len(),
        result,
        stage_times,
    }
}

fn cached_chain<'c>(
    cache: &'c mut PlanCache,
    config: &Arc<ObfuscationConfig>,
) -> Result<&'c ChainExecutor, CodecError> {
    let stale = match cache {
        Some((cached, _)) => !(Arc::ptr_eq(cached, config) || **cached == **config),
        None => true,
    };
    if stale {
        let chain = ChainExecutor::compile(config)?;
        *cache = Some((Arc::clone(config), chain));
    }
    cache
        .as_ref()
        .map(|(_, chain)| chain)
        .ok_or_else(|| CodecError::MalformedConfig("worker plan cache empty".into()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
