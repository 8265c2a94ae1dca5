//! Relaxed thresholds for emergency counts.
//!
//! An emergency count is evaluated against a smaller quorum and a much shorter
//! minimum vote age, but feeds the same controller transition as an ordinary
//! count and produces the same mutation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{Gate, GovernanceConfig};

/// Which thresholds a count trigger is evaluated against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationPath {
    #[default]
    Ordinary,
    Emergency,
}

impl ActivationPath {
    pub fn from_flag(emergency: bool) -> Self {
        if emergency {
            Self::Emergency
        } else {
            Self::Ordinary
        }
    }
}

impl fmt::Display for ActivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ordinary => write!(f, "ordinary"),
            Self::Emergency => write!(f, "emergency"),
        }
    }
}

/// Selects the thresholds for an activation path.
#[derive(Clone, Copy, Debug)]
pub struct EmergencyGate {
    ordinary: Gate,
    emergency: Gate,
}

impl EmergencyGate {
    pub fn new(config: &GovernanceConfig) -> Self {
        Self {
            ordinary: config.ordinary,
            emergency: config.emergency,
        }
    }

    pub fn gate(&self, path: ActivationPath) -> Gate {
        match path {
            ActivationPath::Ordinary => self.ordinary,
            ActivationPath::Emergency => self.emergency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opgov_types::NetworkId;

    #[test]
    fn emergency_is_strictly_more_permissive() {
        let gate = EmergencyGate::new(&GovernanceConfig::for_network(NetworkId::Live));
        let ordinary = gate.gate(ActivationPath::Ordinary);
        let emergency = gate.gate(ActivationPath::Emergency);
        assert!(emergency.quorum <= ordinary.quorum);
        assert!(emergency.min_vote_age_secs < ordinary.min_vote_age_secs);
        assert_eq!(emergency.min_vote_age_secs, 3600);
    }

    #[test]
    fn flag_selects_path() {
        assert_eq!(ActivationPath::from_flag(true), ActivationPath::Emergency);
        assert_eq!(ActivationPath::from_flag(false), ActivationPath::Ordinary);
        assert_eq!(ActivationPath::default(), ActivationPath::Ordinary);
    }
}
