//! transfer/progress.rs
//! Progress reporting and staging status.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Receives `Some(0.0..=100.0)` while a transfer runs and `None` once it
/// completes or resets.
pub type ProgressFn<'a> = &'a mut dyn FnMut(Option<f64>);

/// Terminal and intermediate states of a staged download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StagingStatus {
    Unstaged,
    Staging,
    Staged,
    Saving,
}

impl fmt::Display for StagingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StagingStatus::Unstaged => "unstaged",
            StagingStatus::Staging => "staging",
            StagingStatus::Staged => "staged",
            StagingStatus::Saving => "saving",
        })
    }
}

/// Byte-weighted progress that never moves backwards.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: u64,
    done: u64,
    last: f64,
}

impl ProgressTracker {
    pub fn new(total: u64) -> Self {
        Self { total, done: 0, last: 0.0 }
    }

    /// Record `bytes` more and return the new percentage.
    pub fn advance(&mut self, bytes: u64) -> f64 {
        self.done = self.done.saturating_add(bytes).min(self.total);
        let pct = if self.total == 0 { 100.0 } else { 100.0 * self.done as f64 / self.total as f64 };
        self.last = self.last.max(pct);
        self.last
    }

    pub fn percent(&self) -> f64 {
        self.last
    }

    pub fn bytes_done(&self) -> u64 {
        self.done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_is_monotonic_and_capped() {
        let mut p = ProgressTracker::new(200);
        assert_eq!(p.advance(50), 25.0);
        assert_eq!(p.advance(0), 25.0);
        assert_eq!(p.advance(500), 100.0);
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&StagingStatus::Saving).unwrap(), "\"saving\"");
    }
}
