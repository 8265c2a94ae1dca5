//! Ledger-point timestamps.
//!
//! Governance never reads the wall clock: every timestamp is taken from a
//! stabilized unit and passed in explicitly, so that replaying the same history
//! on any node produces the same decisions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A Unix timestamp in seconds since epoch (UTC), as carried by a ledger unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The epoch (time zero).
    pub const EPOCH: Self = Self(0);

    pub fn new(secs: u64) -> Self {
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Seconds elapsed since this timestamp (relative to `now`).
    pub fn elapsed_since(&self, now: Timestamp) -> u64 {
        now.0.saturating_sub(self.0)
    }

    /// Whether `duration_secs` have passed between this timestamp and `now`.
    pub fn has_aged(&self, duration_secs: u64, now: Timestamp) -> bool {
        now.0 >= self.0.saturating_add(duration_secs)
    }

    pub fn plus(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// Position of a stabilized unit in the ledger's total order.
///
/// `index` is the ordering key (last-write-wins decisions use it, never the
/// timestamp); `timestamp` is the unit's own time, used for vote ages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerPoint {
    pub index: u64,
    pub timestamp: Timestamp,
}

impl LedgerPoint {
    pub fn new(index: u64, timestamp: Timestamp) -> Self {
        Self { index, timestamp }
    }
}

impl fmt::Display for LedgerPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}@{}", self.index, self.timestamp)
    }
}
