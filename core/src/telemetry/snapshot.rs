//! telemetry/snapshot.rs
//! Immutable summary returned by every transfer operation.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::telemetry::counters::TransferCounters;
use crate::telemetry::timers::{StageTimes, TelemetryTimer};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferSnapshot {
    pub path: String,
    pub counters: TransferCounters,
    pub expansion_ratio: f64,
    pub throughput_raw_bytes_per_sec: f64,
    pub elapsed: Duration,
    pub stage_times: StageTimes,
}

impl TransferSnapshot {
    pub fn from(path: &str, counters: &TransferCounters, timer: &TelemetryTimer) -> Self {
        let elapsed = timer.elapsed();
        let throughput = if elapsed.as_secs_f64() > 0.0 {
            counters.bytes_raw as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };
        Self {
            path: path.to_string(),
            counters: counters.clone(),
            expansion_ratio: counters.expansion_ratio(),
            throughput_raw_bytes_per_sec: throughput,
            elapsed,
            stage_times: timer.stage_times.clone(),
        }
    }

    pub fn chunks_completed(&self) -> u64 {
        self.counters.chunks_completed
    }

    /// Every chunk settled successfully and nothing failed.
    pub fn is_complete(&self) -> bool {
        self.counters.chunks_failed == 0 && self.counters.chunks_completed == self.counters.chunks_total
    }
}
