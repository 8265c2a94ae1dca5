//! Governance subjects — the dimensions that can be voted on.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::GovernanceError;

/// A governance dimension. New subjects are added as new variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    /// Membership of the order-provider committee.
    OpList,
    /// Base fee per unit of throughput.
    BaseTpsFee,
    /// Payload size above which units pay the size surcharge.
    ThresholdSize,
    /// Averaging interval of the throughput fee, in seconds.
    TpsInterval,
    /// Multiplier applied to the throughput fee under load.
    TpsFeeMultiplier,
}

/// What kind of payload a subject's votes carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Committee,
    Numeric,
}

impl Subject {
    pub const ALL: [Subject; 5] = [
        Self::OpList,
        Self::BaseTpsFee,
        Self::ThresholdSize,
        Self::TpsInterval,
        Self::TpsFeeMultiplier,
    ];

    /// Wire name, as carried in vote and count messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::OpList => "op_list",
            Self::BaseTpsFee => "base_tps_fee",
            Self::ThresholdSize => "threshold_size",
            Self::TpsInterval => "tps_interval",
            Self::TpsFeeMultiplier => "tps_fee_multiplier",
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Self::OpList => ValueKind::Committee,
            _ => ValueKind::Numeric,
        }
    }
}

impl FromStr for Subject {
    type Err = GovernanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|subject| subject.name() == s)
            .ok_or_else(|| GovernanceError::InvalidSubject(s.to_string()))
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_roundtrip() {
        for subject in Subject::ALL {
            assert_eq!(subject.name().parse::<Subject>().unwrap(), subject);
        }
    }

    #[test]
    fn unknown_subject_is_invalid() {
        assert!(matches!(
            "witness_count".parse::<Subject>(),
            Err(GovernanceError::InvalidSubject(name)) if name == "witness_count"
        ));
    }
}
