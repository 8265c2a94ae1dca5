//! Nullable ledger clock — deterministic ledger points for testing.

use opgov_types::{LedgerPoint, Timestamp};
use std::cell::Cell;

/// A deterministic ledger clock.
///
/// Time only advances when you tell it to. Every call to [`NullClock::next_point`]
/// yields the next position in the ledger's total order.
pub struct NullClock {
    current: Cell<u64>,
    index: Cell<u64>,
}

impl NullClock {
    pub fn new(initial_secs: u64) -> Self {
        Self {
            current: Cell::new(initial_secs),
            index: Cell::new(0),
        }
    }

    /// Get the current time.
    pub fn now(&self) -> Timestamp {
        Timestamp::new(self.current.get())
    }

    /// Advance time by a number of seconds.
    pub fn advance(&self, secs: u64) {
        self.current.set(self.current.get() + secs);
    }

    /// Set the time to a specific value.
    pub fn set(&self, secs: u64) {
        self.current.set(secs);
    }

    /// Allocate the next ledger point at the current time.
    pub fn next_point(&self) -> LedgerPoint {
        let index = self.index.get() + 1;
        self.index.set(index);
        LedgerPoint::new(index, self.now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_are_strictly_ordered() {
        let clock = NullClock::new(1_000);
        let a = clock.next_point();
        clock.advance(60);
        let b = clock.next_point();
        let c = clock.next_point();
        assert!(a.index < b.index && b.index < c.index);
        assert_eq!(b.timestamp, Timestamp::new(1_060));
        assert_eq!(b.timestamp, c.timestamp);
    }
}
