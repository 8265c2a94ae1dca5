//! CommitteeState — the active committee and active parameter values.
//!
//! This is the single source of truth for "what is in force". It is loaded from
//! (or bootstrapped into) a [`ParamStore`] and mutated only by the activation
//! controller, exactly once per activation.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use opgov_store::ParamStore;
use opgov_types::{LedgerPoint, Timestamp, TypesError, UnitHash};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::subject::Subject;
use crate::value::{CommitteeList, SubjectValue};
use crate::GovernanceError;

type Blake2b256 = Blake2b<U32>;

/// The value currently in force for a subject.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveParam {
    pub subject: Subject,
    pub value: SubjectValue,
    /// Timestamp of the stabilization that activated this value.
    pub activated_at: Timestamp,
    /// Ledger index of that stabilization; 0 for genesis.
    pub activated_index: u64,
    /// Count unit that triggered the activation; zero for genesis.
    pub activated_by: UnitHash,
    /// 0 at genesis, +1 per activation.
    pub version: u64,
}

impl ActiveParam {
    pub fn genesis(subject: Subject, value: SubjectValue) -> Self {
        Self {
            subject,
            value,
            activated_at: Timestamp::EPOCH,
            activated_index: 0,
            activated_by: UnitHash::ZERO,
            version: 0,
        }
    }

    /// Record replacing `self` with `value`.
    pub fn successor(&self, value: SubjectValue, stabilized_at: LedgerPoint, trigger: UnitHash) -> Self {
        Self {
            subject: self.subject,
            value,
            activated_at: stabilized_at.timestamp,
            activated_index: stabilized_at.index,
            activated_by: trigger,
            version: self.version + 1,
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.version == 0
    }
}

/// Blake2b-256 digest of a [`CommitteeState`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateDigest([u8; 32]);

impl StateDigest {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for StateDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for StateDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateDigest({self})")
    }
}

impl FromStr for StateDigest {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UnitHash::from_hex(s).map(|h| Self(*h.as_bytes()))
    }
}

/// Active value of every subject plus the committee's activation history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitteeState {
    active: BTreeMap<Subject, ActiveParam>,
    /// Every committee record ever in force, ascending by version.
    committees: Vec<ActiveParam>,
}

impl CommitteeState {
    /// Load the active records from `store`.
    ///
    /// A subject with no stored record is bootstrapped from `genesis` (version
    /// 0). Without a genesis value that is [`GovernanceError::MissingActiveValue`].
    pub fn load<S: ParamStore>(
        store: &S,
        genesis: &[(Subject, SubjectValue)],
    ) -> Result<Self, GovernanceError> {
        let mut active = BTreeMap::new();
        for subject in Subject::ALL {
            let record = match store.get_active(subject.name())? {
                Some(bytes) => decode_param(subject, &bytes)?,
                None => {
                    let value = genesis
                        .iter()
                        .find(|(s, _)| *s == subject)
                        .map(|(_, v)| v.clone())
                        .ok_or(GovernanceError::MissingActiveValue(subject))?;
                    let record = ActiveParam::genesis(subject, value);
                    store.commit_activation(subject.name(), 0, &bincode::serialize(&record)?)?;
                    tracing::info!(%subject, value = %record.value, "bootstrapped genesis value");
                    record
                }
            };
            active.insert(subject, record);
        }

        let committees = store
            .iter_history(Subject::OpList.name())?
            .into_iter()
            .map(|(_, bytes)| decode_param(Subject::OpList, &bytes))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { active, committees })
    }

    pub fn get_active(&self, subject: Subject) -> Result<&ActiveParam, GovernanceError> {
        self.active
            .get(&subject)
            .ok_or(GovernanceError::MissingActiveValue(subject))
    }

    /// The committee currently in force.
    pub fn committee(&self) -> Result<&CommitteeList, GovernanceError> {
        committee_of(self.get_active(Subject::OpList)?)
    }

    /// The committee governing a unit stabilized at `point`.
    ///
    /// A swap takes effect at its own stabilization point: units before it are
    /// governed by the previous committee, units at or after it by the new one.
    pub fn committee_at(&self, point: &LedgerPoint) -> Result<&CommitteeList, GovernanceError> {
        let record = self
            .committees
            .iter()
            .rev()
            .find(|r| r.activated_index <= point.index)
            .ok_or(GovernanceError::MissingActiveValue(Subject::OpList))?;
        committee_of(record)
    }

    /// Every committee record, oldest first.
    pub fn committee_history(&self) -> &[ActiveParam] {
        &self.committees
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActiveParam> {
        self.active.values()
    }

    /// Blake2b-256 over the canonical encoding of every active record, in
    /// subject order.
    pub fn digest(&self) -> Result<StateDigest, GovernanceError> {
        let mut hasher = Blake2b256::new();
        for record in self.active.values() {
            hasher.update(bincode::serialize(record)?);
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        Ok(StateDigest(out))
    }

    /// Install a record that has already been committed to the store.
    pub(crate) fn apply(&mut self, record: ActiveParam) {
        if record.subject == Subject::OpList {
            self.committees.push(record.clone());
        }
        self.active.insert(record.subject, record);
    }
}

fn committee_of(record: &ActiveParam) -> Result<&CommitteeList, GovernanceError> {
    record
        .value
        .as_committee()
        .ok_or_else(|| GovernanceError::malformed(Subject::OpList, "active record is not a committee"))
}

pub(crate) fn decode_param(subject: Subject, bytes: &[u8]) -> Result<ActiveParam, GovernanceError> {
    let record: ActiveParam = bincode::deserialize(bytes)?;
    if record.subject != subject {
        return Err(GovernanceError::Serialization(format!(
            "record stored under {subject} belongs to {}",
            record.subject
        )));
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Genesis;
    use opgov_nullables::NullStore;
    use opgov_types::{Address, Decimal};

    fn addr(c: char) -> Address {
        Address::parse(&c.to_string().repeat(32)).unwrap()
    }

    fn genesis() -> Vec<(Subject, SubjectValue)> {
        Genesis::new(vec![addr('A'), addr('B'), addr('C')])
            .values(3)
            .unwrap()
    }

    #[test]
    fn bootstraps_genesis_once() {
        let store = NullStore::new();
        let state = CommitteeState::load(&store, &genesis()).unwrap();
        assert!(state.get_active(Subject::OpList).unwrap().is_genesis());
        assert_eq!(state.committee().unwrap().len(), 3);
        assert_eq!(state.committee_history().len(), 1);

        // A second load reads the stored records and ignores the genesis input.
        let reloaded = CommitteeState::load(&store, &[]).unwrap();
        assert_eq!(reloaded, state);
    }

    #[test]
    fn missing_genesis_is_an_error() {
        let store = NullStore::new();
        let err = CommitteeState::load(&store, &[]);
        assert!(matches!(err, Err(GovernanceError::MissingActiveValue(Subject::OpList))));
    }

    #[test]
    fn committee_at_switches_at_stabilization_point() {
        let store = NullStore::new();
        let mut state = CommitteeState::load(&store, &genesis()).unwrap();
        let next = SubjectValue::OpList(
            CommitteeList::new(vec![addr('D'), addr('B'), addr('C')], 3).unwrap(),
        );
        let swap_at = LedgerPoint::new(50, Timestamp::new(5_000));
        let record = state
            .get_active(Subject::OpList)
            .unwrap()
            .successor(next.clone(), swap_at, UnitHash::new([9; 32]));
        state.apply(record);

        let before = LedgerPoint::new(49, Timestamp::new(4_999));
        assert!(state.committee_at(&before).unwrap().contains(&addr('A')));
        assert_eq!(Some(state.committee_at(&swap_at).unwrap()), next.as_committee());
        assert_eq!(state.get_active(Subject::OpList).unwrap().version, 1);
    }

    #[test]
    fn digest_tracks_active_values() {
        let store = NullStore::new();
        let mut state = CommitteeState::load(&store, &genesis()).unwrap();
        let before = state.digest().unwrap();
        assert_eq!(before, CommitteeState::load(&NullStore::new(), &genesis()).unwrap().digest().unwrap());

        let record = state.get_active(Subject::BaseTpsFee).unwrap().successor(
            SubjectValue::Numeric("100.3".parse::<Decimal>().unwrap()),
            LedgerPoint::new(7, Timestamp::new(70)),
            UnitHash::new([1; 32]),
        );
        state.apply(record);
        assert_ne!(state.digest().unwrap(), before);
        assert_eq!(state.digest().unwrap().to_string().len(), 64);
    }
}
