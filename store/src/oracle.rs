//! Read-only views of the surrounding ledger.
//!
//! The governance engine does not own balances or unit ordering. It consumes
//! them through these two traits, implemented by the host ledger (and by
//! `opgov-nullables` in tests).

use crate::StoreError;
use opgov_types::{Address, BaseAmount, LedgerPoint, UnitHash};

/// Reports an address's spendable base-asset balance at a ledger point.
pub trait StakeOracle {
    fn balance_at(&self, address: &Address, at: &LedgerPoint) -> Result<BaseAmount, StoreError>;
}

/// Reports whether a unit's position in the ledger has become final.
pub trait StabilitySignal {
    fn is_stable(&self, unit: &UnitHash) -> bool;
}
