//! Governance configuration with TOML file support.
//!
//! Quorum thresholds and minimum vote ages are calibration constants of a
//! deployment, not protocol invariants. Each network has built-in defaults;
//! a TOML file may override any of them.

use opgov_types::{Address, Decimal, NetworkId, BASE_UNIT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::subject::Subject;
use crate::value::{CommitteeList, SubjectValue};
use crate::GovernanceError;

const HOUR: u64 = 3600;
const DAY: u64 = 24 * HOUR;

/// Fixed cost, in bytes, burned by every count unit.
pub const DEFAULT_ACTIVATION_COST: u128 = BASE_UNIT;

/// How a vote's weight is determined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightingMode {
    /// The voter's balance at the vote's ledger point, frozen into the vote.
    AtCast,
    /// The voter's balance at the count trigger's ledger point.
    AtCount,
}

/// Thresholds of one activation path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gate {
    /// Minimum total weight (bytes) the leading value must hold.
    pub quorum: u128,
    /// Minimum age of the leading value's earliest vote at count time.
    pub min_vote_age_secs: u64,
}

/// Resolved governance configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceConfig {
    pub network: NetworkId,
    /// Fixed committee cardinality.
    pub committee_size: usize,
    pub ordinary: Gate,
    pub emergency: Gate,
    /// Cost burned by the submitter of every count unit, whatever the outcome.
    pub activation_cost: u128,
    pub weighting: WeightingMode,
}

impl GovernanceConfig {
    /// Built-in defaults for a network.
    pub fn for_network(network: NetworkId) -> Self {
        let (ordinary_quorum, emergency_quorum) = match network {
            NetworkId::Live => (500_000 * BASE_UNIT, 100_000 * BASE_UNIT),
            NetworkId::Test | NetworkId::Dev => (100_000 * BASE_UNIT, 10_000 * BASE_UNIT),
        };
        Self {
            network,
            committee_size: network.committee_size(),
            ordinary: Gate {
                quorum: ordinary_quorum,
                min_vote_age_secs: 3 * DAY,
            },
            emergency: Gate {
                quorum: emergency_quorum,
                min_vote_age_secs: HOUR,
            },
            activation_cost: DEFAULT_ACTIVATION_COST,
            weighting: WeightingMode::AtCast,
        }
    }

    /// Check the relations between the two activation paths.
    pub fn validate(&self) -> Result<(), GovernanceError> {
        if self.committee_size == 0 {
            return Err(GovernanceError::Config("committee_size must be positive".into()));
        }
        if self.ordinary.quorum == 0 || self.emergency.quorum == 0 {
            return Err(GovernanceError::Config("quorum must be positive".into()));
        }
        if self.emergency.quorum > self.ordinary.quorum {
            return Err(GovernanceError::Config(format!(
                "emergency quorum {} exceeds ordinary quorum {}",
                self.emergency.quorum, self.ordinary.quorum
            )));
        }
        if self.emergency.min_vote_age_secs >= self.ordinary.min_vote_age_secs {
            return Err(GovernanceError::Config(format!(
                "emergency min vote age {}s must be shorter than ordinary {}s",
                self.emergency.min_vote_age_secs, self.ordinary.min_vote_age_secs
            )));
        }
        Ok(())
    }

    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<(Self, Option<Genesis>), GovernanceError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| GovernanceError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration (and an optional `[genesis]` table) from TOML.
    pub fn from_toml_str(s: &str) -> Result<(Self, Option<Genesis>), GovernanceError> {
        let file: ConfigFile =
            toml::from_str(s).map_err(|e| GovernanceError::Config(e.to_string()))?;
        let config = file.resolve();
        config.validate()?;
        Ok((config, file.genesis))
    }
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self::for_network(NetworkId::Dev)
    }
}

/// On-disk shape: every field optional, layered over the network defaults.
///
/// Amounts are `u64` here because TOML integers are 64-bit.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub network: Option<NetworkId>,
    pub committee_size: Option<usize>,
    pub ordinary_quorum: Option<u64>,
    pub ordinary_min_vote_age_secs: Option<u64>,
    pub emergency_quorum: Option<u64>,
    pub emergency_min_vote_age_secs: Option<u64>,
    pub activation_cost: Option<u64>,
    pub weighting: Option<WeightingMode>,
    pub genesis: Option<Genesis>,
}

impl ConfigFile {
    pub fn resolve(&self) -> GovernanceConfig {
        let mut config = GovernanceConfig::for_network(self.network.unwrap_or(NetworkId::Dev));
        if let Some(size) = self.committee_size {
            config.committee_size = size;
        }
        if let Some(q) = self.ordinary_quorum {
            config.ordinary.quorum = q.into();
        }
        if let Some(age) = self.ordinary_min_vote_age_secs {
            config.ordinary.min_vote_age_secs = age;
        }
        if let Some(q) = self.emergency_quorum {
            config.emergency.quorum = q.into();
        }
        if let Some(age) = self.emergency_min_vote_age_secs {
            config.emergency.min_vote_age_secs = age;
        }
        if let Some(cost) = self.activation_cost {
            config.activation_cost = cost.into();
        }
        if let Some(w) = self.weighting {
            config.weighting = w;
        }
        config
    }
}

/// Bootstrap values every node starts from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genesis {
    pub op_list: Vec<Address>,
    /// Numeric subjects by wire name; decimals are written as strings.
    #[serde(default = "default_numeric_params")]
    pub params: BTreeMap<String, Decimal>,
}

fn default_numeric_params() -> BTreeMap<String, Decimal> {
    [
        (Subject::BaseTpsFee, 10),
        (Subject::ThresholdSize, 10_000),
        (Subject::TpsInterval, 1),
        (Subject::TpsFeeMultiplier, 10),
    ]
    .into_iter()
    .map(|(subject, value)| (subject.name().to_string(), Decimal::from_integer(value)))
    .collect()
}

impl Genesis {
    /// Genesis with the given committee and default numeric parameters.
    pub fn new(op_list: Vec<Address>) -> Self {
        Self {
            op_list,
            params: default_numeric_params(),
        }
    }

    /// Validated bootstrap value of every subject.
    pub fn values(&self, committee_size: usize) -> Result<Vec<(Subject, SubjectValue)>, GovernanceError> {
        for name in self.params.keys() {
            let subject: Subject = name.parse()?;
            if subject == Subject::OpList {
                return Err(GovernanceError::Config("op_list is not a numeric parameter".into()));
            }
        }
        let mut values = vec![(
            Subject::OpList,
            SubjectValue::OpList(CommitteeList::new(self.op_list.clone(), committee_size)?),
        )];
        for subject in Subject::ALL.into_iter().filter(|s| *s != Subject::OpList) {
            let number = self.params.get(subject.name()).copied().ok_or_else(|| {
                GovernanceError::Config(format!("genesis has no value for {subject}"))
            })?;
            let value = SubjectValue::Numeric(number);
            value.validate(subject, committee_size)?;
            values.push((subject, value));
        }
        Ok(values)
    }
}
