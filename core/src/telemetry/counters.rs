//! telemetry/counters.rs
//! Mutable counters collected on the control thread during a transfer.
//! Folded into an immutable `TransferSnapshot` when the transfer ends.

use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

#[derive(Default, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferCounters {
    pub chunks_total: u64,
    pub chunks_dispatched: u64,
    pub chunks_completed: u64,
    pub chunks_failed: u64,
    /// Payload bytes before obfuscation (after deobfuscation on download).
    pub bytes_raw: u64,
    /// Obfuscated bytes as carried on the wire.
    pub bytes_wire: u64,
    pub peak_in_flight: u64,
}

impl TransferCounters {
    pub fn new(chunks_total: u64) -> Self {
        Self { chunks_total, ..Self::default() }
    }

    pub fn add_dispatched(&mut self, in_flight: u64) {
        self.chunks_dispatched += 1;
        self.peak_in_flight = self.peak_in_flight.max(in_flight);
    }

    /// One chunk settled successfully.
    pub fn add_completed(&mut self, raw_len: usize, wire_len: usize) {
        self.chunks_completed += 1;
        self.bytes_raw += raw_len as u64;
        self.bytes_wire += wire_len as u64;
    }

    pub fn add_failed(&mut self) {
        self.chunks_failed += 1;
    }

    /// Wire bytes per raw byte; 0 when nothing was transferred.
    pub fn expansion_ratio(&self) -> f64 {
        if self.bytes_raw == 0 {
            0.0
        } else {
            self.bytes_wire as f64 / self.bytes_raw as f64
        }
    }

    pub fn merge(&mut self, other: &TransferCounters) {
        self.chunks_total += other.chunks_total;
        self.chunks_dispatched += other.chunks_dispatched;
        self.chunks_completed += other.chunks_completed;
        self.chunks_failed += other.chunks_failed;
        self.bytes_raw += other.bytes_raw;
        self.bytes_wire += other.bytes_wire;
        self.peak_in_flight = self.peak_in_flight.max(other.peak_in_flight);
    }
}

impl AddAssign for TransferCounters {
    fn add_assign(&mut self, rhs: Self) {
        self.merge(&rhs);
    }
}
