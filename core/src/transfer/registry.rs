//! transfer/registry.rs
//! Process-wide record of running transfers.
//!
//! A path has at most one registered transfer. Registering it twice, or
//! deregistering a path that is not registered, is a caller bug and fails
//! with `ConcurrencyMisuseError`. Create one registry at startup, share it by
//! reference, and `teardown()` it on logout.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferDirection {
    Up,
    Down,
}

impl fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransferDirection::Up => "up",
            TransferDirection::Down => "down",
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConcurrencyMisuseError {
    #[error("transfer already exists for {path} ({direction})")]
    DuplicateTransfer { path: String, direction: TransferDirection },

    #[error("unknown transfer specified: {path}")]
    UnknownTransfer { path: String },
}

#[derive(Debug, Clone)]
struct Entry {
    direction: TransferDirection,
    in_flight: BTreeSet<u64>,
    started_at: DateTime<Utc>,
}

/// Point-in-time view of one registered transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferInfo {
    pub path: String,
    pub direction: TransferDirection,
    pub in_flight: Vec<u64>,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct TransferRegistry {
    entries: Mutex<HashMap<String, Entry>>,
}

impl TransferRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn register(&self, path: &str, direction: TransferDirection) -> Result<(), ConcurrencyMisuseError> {
        let mut entries = self.entries();
        if let Some(existing) = entries.get(path) {
            error!(target: "obfs::registry", path, %direction, existing = %existing.direction,
                "[REGISTRY] duplicate transfer registration");
            return Err(ConcurrencyMisuseError::DuplicateTransfer {
                path: path.to_string(),
                direction: existing.direction,
            });
        }
        entries.insert(
            path.to_string(),
            Entry { direction, in_flight: BTreeSet::new(), started_at: Utc::now() },
        );
        info!(target: "obfs::registry", path, %direction, "[REGISTRY] transfer registered");
        Ok(())
    }

    pub fn deregister(&self, path: &str) -> Result<TransferDirection, ConcurrencyMisuseError> {
        match self.entries().remove(path) {
            Some(entry) => {
                if !entry.in_flight.is_empty() {
                    warn!(target: "obfs::registry", path, in_flight = entry.in_flight.len(),
                        "[REGISTRY] deregistered with chunks still in flight");
                }
                info!(target: "obfs::registry", path, "[REGISTRY] transfer deregistered");
                Ok(entry.direction)
            }
            None => {
                error!(target: "obfs::registry", path, "[REGISTRY] deregister of unknown transfer");
                Err(ConcurrencyMisuseError::UnknownTransfer { path: path.to_string() })
            }
        }
    }

    /// Register `path` and return a guard that deregisters it on drop.
    pub fn guard(&self, path: &str, direction: TransferDirection) -> Result<TransferGuard<'_>, ConcurrencyMisuseError> {
        self.register(path, direction)?;
        Ok(TransferGuard { registry: self, path: path.to_string(), released: false })
    }

    pub fn is_registered(&self, path: &str) -> bool {
        self.entries().contains_key(path)
    }

    pub fn direction(&self, path: &str) -> Option<TransferDirection> {
        self.entries().get(path).map(|e| e.direction)
    }

    pub fn mark_in_flight(&self, path: &str, index: u64) {
        if let Some(e) = self.entries().get_mut(path) {
            e.in_flight.insert(index);
        }
    }

    pub fn mark_settled(&self, path: &str, index: u64) {
        if let Some(e) = self.entries().get_mut(path) {
            e.in_flight.remove(&index);
        }
    }

    pub fn in_flight(&self, path: &str) -> Vec<u64> {
        self.entries()
            .get(path)
            .map(|e| e.in_flight.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn transfer_count(&self) -> usize {
        self.entries().len()
    }

    /// All registered transfers, sorted by path.
    pub fn snapshot(&self) -> Vec<TransferInfo> {
        let mut out: Vec<TransferInfo> = self
            .entries()
            .iter()
            .map(|(path, e)| TransferInfo {
                path: path.clone(),
                direction: e.direction,
                in_flight: e.in_flight.iter().copied().collect(),
                started_at: e.started_at,
            })
            .collect();
        out.sort_by(|a, b| a.path.cmp(&b.path));
        out
    }

    /// Drop every registration (logout). Returns how many were cleared.
    pub fn teardown(&self) -> usize {
        let mut entries = self.entries();
        let n = entries.len();
        entries.clear();
        if n > 0 {
            warn!(target: "obfs::registry", cleared = n, "[REGISTRY] teardown with active transfers");
        }
        n
    }
}

/// Keeps a path registered for as long as it lives.
pub struct TransferGuard<'a> {
    registry: &'a TransferRegistry,
    path: String,
    released: bool,
}

impl TransferGuard<'_> {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn mark_in_flight(&self, index: u64) {
        self.registry.mark_in_flight(&self.path, index);
    }

    pub fn mark_settled(&self, index: u64) {
        self.registry.mark_settled(&self.path, index);
    }

    /// Deregister now and report misuse (e.g. a teardown happened meanwhile).
    pub fn release(mut self) -> Result<(), ConcurrencyMisuseError> {
        self.released = true;
        self.registry.deregister(&self.path).map(|_| ())
    }
}

impl Drop for TransferGuard<'_> {
    fn drop(&mut self) {
        if !self.released {
            // Error already logged by `deregister`.
            let _ = self.registry.deregister(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_deregisters_on_drop() {
        let reg = TransferRegistry::new();
        {
            let g = reg.guard("/x", TransferDirection::Up).unwrap();
            g.mark_in_flight(3);
            assert_eq!(reg.in_flight("/x"), vec![3]);
            assert_eq!(reg.transfer_count(), 1);
        }
        assert!(!reg.is_registered("/x"));
    }

    #[test]
    fn snapshot_and_teardown() {
        let reg = TransferRegistry::new();
        reg.register("/b", TransferDirection::Down).unwrap();
        reg.register("/a", TransferDirection::Up).unwrap();
        let snap = reg.snapshot();
        assert_eq!(snap.iter().map(|t| t.path.as_str()).collect::<Vec<_>>(), vec!["/a", "/b"]);
        assert_eq!(reg.teardown(), 2);
        assert_eq!(reg.transfer_count(), 0);
    }
}
