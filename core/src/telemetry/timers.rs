//! telemetry/timers.rs
//! Per-stage durations and the wall clock of one transfer.
//!
//! Worker-side stages (obfuscate, deobfuscate, put) are measured inside the
//! worker and shipped back with the task outcome; control-side stages
//! (fetch, write) are measured where they run. Worker stages overlap, so
//! their sum can exceed wall time.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Obfuscate,
    Deobfuscate,
    Fetch,
    Put,
    Write,
}

impl Stage {
    pub const fn name(self) -> &'static str {
        match self {
            Stage::Obfuscate => "obfuscate",
            Stage::Deobfuscate => "deobfuscate",
            Stage::Fetch => "fetch",
            Stage::Put => "put",
            Stage::Write => "write",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accumulated time per stage, ordered by stage for stable output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageTimes(BTreeMap<Stage, Duration>);

impl StageTimes {
    pub fn add(&mut self, stage: Stage, dur: Duration) {
        *self.0.entry(stage).or_default() += dur;
    }

    pub fn get(&self, stage: Stage) -> Duration {
        self.0.get(&stage).copied().unwrap_or_default()
    }

    pub fn total(&self) -> Duration {
        self.0.values().sum()
    }

    pub fn merge(&mut self, other: &StageTimes) {
        for (&stage, &dur) in &other.0 {
            self.add(stage, dur);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Stage, Duration)> + '_ {
        self.0.iter().map(|(s, d)| (*s, *d))
    }
}

#[derive(Clone, Debug)]
pub struct TelemetryTimer {
    started: Instant,
    finished: Option<Instant>,
    pub stage_times: StageTimes,
}

impl Default for TelemetryTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryTimer {
    pub fn new() -> Self {
        Self { started: Instant::now(), finished: None, stage_times: StageTimes::default() }
    }

    pub fn add_stage_time(&mut self, stage: Stage, dur: Duration) {
        self.stage_times.add(stage, dur);
    }

    /// Stop the wall clock. Later calls keep the first stop time.
    pub fn finish(&mut self) {
        self.finished.get_or_insert_with(Instant::now);
    }

    pub fn elapsed(&self) -> Duration {
        self.finished.unwrap_or_else(Instant::now).duration_since(self.started)
    }
}
