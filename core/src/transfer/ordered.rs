//! transfer/ordered.rs
//! Ascending-index writer for out-of-order chunk results.
//!
//! Decoded chunks may arrive in any order; bytes reach the sink strictly in
//! index order. A chunk that arrives early waits in `pending` until every
//! lower index has been written.
//!
//! `pending` is unbounded here. Memory is bounded by the caller: reassembly
//! stops dispatching while `pending()` is at `max_workers`, so at most about
//! twice the worker count of decoded chunks are held at once.

use std::collections::BTreeMap;
use std::io::Write;

use bytes::Bytes;
use tracing::trace;

use crate::types::{IntegrityError, TransferError};

pub struct OrderedAssembler<W: Write> {
    out: W,
    next: u64,
    pending: BTreeMap<u64, Bytes>,
    bytes_written: u64,
    write_order: Vec<u64>,
}

impl<W: Write> OrderedAssembler<W> {
    pub fn new(out: W) -> Self {
        Self { out, next: 0, pending: BTreeMap::new(), bytes_written: 0, write_order: Vec::new() }
    }

    /// Accept chunk `index`; write it and any unblocked successors.
    /// Returns how many chunks reached the sink.
    pub fn push(&mut self, index: u64, data: Bytes) -> Result<usize, TransferError> {
        if index < self.next {
            return Err(IntegrityError::OutOfOrder { index, next: self.next }.into());
        }
        if self.pending.insert(index, data).is_some() {
            return Err(IntegrityError::Duplicate { index }.into());
        }
        self.flush_ready()
    }

    fn flush_ready(&mut self) -> Result<usize, TransferError> {
        let mut written = 0;
        while let Some(data) = self.pending.remove(&self.next) {
            trace!(target: "obfs::ordered", index = self.next, len = data.len(), "[ASSEMBLER] write");
            self.out.write_all(&data)?;
            self.bytes_written += data.len() as u64;
            self.write_order.push(self.next);
            self.next += 1;
            written += 1;
        }
        Ok(written)
    }

    /// Index the assembler is waiting for.
    pub fn next_index(&self) -> u64 {
        self.next
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Indices in the order they were written to the sink.
    pub fn write_order(&self) -> &[u64] {
        &self.write_order
    }

    /// Flush the sink. Fails if chunks are still waiting on a gap.
    pub fn finish(mut self) -> Result<(W, u64), TransferError> {
        if !self.pending.is_empty() {
            return Err(IntegrityError::Incomplete { next: self.next, pending: self.pending.len() }.into());
        }
        self.out.flush()?;
        Ok((self.out, self.bytes_written))
    }
}
