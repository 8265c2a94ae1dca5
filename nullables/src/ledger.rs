//! Nullable ledger views — balances and stability under test control.

use opgov_store::{StabilitySignal, StakeOracle, StoreError};
use opgov_types::{Address, BaseAmount, LedgerPoint, UnitHash};
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

/// Balances that can be changed over (ledger) time.
///
/// Each address keeps a list of `(from_index, balance)` steps; the balance at a
/// point is the last step whose index is not after the point.
#[derive(Default)]
pub struct NullStakeOracle {
    balances: Mutex<BTreeMap<Address, Vec<(u64, BaseAmount)>>>,
}

impl NullStakeOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a balance effective from the very beginning of the ledger.
    pub fn set_balance(&self, address: &Address, amount: u128) {
        self.set_balance_from(address, 0, amount);
    }

    /// Set a balance effective from ledger index `from_index` onwards.
    pub fn set_balance_from(&self, address: &Address, from_index: u64, amount: u128) {
        let mut balances = self.balances.lock().unwrap();
        let steps = balances.entry(address.clone()).or_default();
        steps.retain(|(idx, _)| *idx != from_index);
        steps.push((from_index, BaseAmount::new(amount)));
        steps.sort_by_key(|(idx, _)| *idx);
    }
}

impl StakeOracle for NullStakeOracle {
    fn balance_at(&self, address: &Address, at: &LedgerPoint) -> Result<BaseAmount, StoreError> {
        let balances = self.balances.lock().unwrap();
        Ok(balances
            .get(address)
            .and_then(|steps| {
                steps
                    .iter()
                    .take_while(|(idx, _)| *idx <= at.index)
                    .last()
                    .map(|(_, amount)| *amount)
            })
            .unwrap_or(BaseAmount::ZERO))
    }
}

/// Stability signal that only reports units explicitly marked stable.
#[derive(Default)]
pub struct NullStability {
    stable: Mutex<HashSet<UnitHash>>,
}

impl NullStability {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_stable(&self, unit: &UnitHash) {
        self.stable.lock().unwrap().insert(*unit);
    }
}

impl StabilitySignal for NullStability {
    fn is_stable(&self, unit: &UnitHash) -> bool {
        self.stable.lock().unwrap().contains(unit)
    }
}
