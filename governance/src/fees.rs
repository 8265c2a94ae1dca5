//! Fees charged to the submitters of governance units.
//!
//! Commissions are computed by the host ledger and passed through; governance
//! adds the voter's optional burn fee and the fixed activation cost of count
//! units. Both are burned, never refunded.

use opgov_types::BaseAmount;
use serde::{Deserialize, Serialize};

/// Commissions the host ledger charged for a unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitCommissions {
    pub headers: BaseAmount,
    pub payload: BaseAmount,
    pub tps_fee: BaseAmount,
}

impl UnitCommissions {
    pub fn total(&self) -> BaseAmount {
        self.headers + self.payload + self.tps_fee
    }
}

/// Everything a governance unit costs its submitter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Charge {
    pub commissions: BaseAmount,
    pub burn_fee: BaseAmount,
    pub activation_cost: BaseAmount,
}

impl Charge {
    /// Charge for a vote unit.
    pub fn vote(commissions: UnitCommissions, burn_fee: BaseAmount) -> Self {
        Self {
            commissions: commissions.total(),
            burn_fee,
            activation_cost: BaseAmount::ZERO,
        }
    }

    /// Charge for a count unit. The activation cost is due whatever the
    /// count's outcome.
    pub fn count(commissions: UnitCommissions, activation_cost: BaseAmount) -> Self {
        Self {
            commissions: commissions.total(),
            burn_fee: BaseAmount::ZERO,
            activation_cost,
        }
    }

    pub fn total(&self) -> BaseAmount {
        self.commissions + self.burn_fee + self.activation_cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opgov_types::BASE_UNIT;

    #[test]
    fn count_charge_includes_activation_cost() {
        let commissions = UnitCommissions {
            headers: BaseAmount::new(300),
            payload: BaseAmount::new(200),
            tps_fee: BaseAmount::new(10),
        };
        let charge = Charge::count(commissions, BaseAmount::new(BASE_UNIT));
        assert_eq!(charge.total().raw(), BASE_UNIT + 510);
        assert!(charge.burn_fee.is_zero());
    }

    #[test]
    fn vote_charge_burns_fee() {
        let charge = Charge::vote(UnitCommissions::default(), BaseAmount::new(42));
        assert_eq!(charge.total().raw(), 42);
        assert!(charge.activation_cost.is_zero());
    }
}
