//! ActivationController — turns a stable count trigger into an activation.
//!
//! Per subject the controller moves `Idle → CountRequested → (Activated |
//! Rejected) → Idle`. The tally is fixed when the count is submitted, so votes
//! landing between the count unit and its stabilization cannot sway it.
//! Evaluation is a pure function of that snapshot, the active record, the gate
//! and the trigger's timestamp; the only mutation is the single transition in
//! [`ActivationController::conclude`].

use opgov_store::{ParamStore, StabilitySignal};
use opgov_types::{Address, LedgerPoint, Timestamp, UnitHash};
use opgov_utils::format_duration;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::committee::{ActiveParam, CommitteeState};
use crate::config::{Gate, GovernanceConfig};
use crate::emergency::{ActivationPath, EmergencyGate};
use crate::subject::Subject;
use crate::tally::TallyEntry;
use crate::value::SubjectValue;
use crate::GovernanceError;

/// A count unit asking for `subject` to be evaluated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountTrigger {
    pub unit: UnitHash,
    pub subject: Subject,
    pub submitter: Address,
    /// Where the count unit sits in the ledger; its timestamp is the reference
    /// for vote ages.
    pub point: LedgerPoint,
    pub path: ActivationPath,
}

/// A submitted trigger and the leading tally entry at its ledger point.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCount {
    pub trigger: CountTrigger,
    /// `None` when nobody had voted on the subject.
    pub leader: Option<TallyEntry>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubjectPhase {
    Idle,
    CountRequested,
}

/// Why a stable count did not activate anything.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// The leading value (if any) holds less than the quorum.
    QuorumNotMet { have: u128, need: u128 },
    /// The leading value's oldest vote is younger than the minimum age.
    VoteTooYoung { age_secs: u64, min_age_secs: u64 },
    /// The leading value is already active.
    NoChange,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QuorumNotMet { have, need } => write!(f, "quorum not met ({have} < {need})"),
            Self::VoteTooYoung {
                age_secs,
                min_age_secs,
            } => write!(
                f,
                "votes too young ({} < {})",
                format_duration(*age_secs),
                format_duration(*min_age_secs)
            ),
            Self::NoChange => write!(f, "leading value is already active"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CountOutcome {
    /// The trigger unit is not stable yet.
    Pending,
    Activated(ActiveParam),
    Rejected(RejectReason),
}

/// Result of evaluating a trigger against a tally.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Activate(SubjectValue),
    Reject(RejectReason),
}

/// Apply the gate to a ranked tally.
///
/// Checks run in a fixed order: quorum (an empty tally counts as zero weight),
/// then vote age, then whether the value would change anything.
pub fn evaluate(tally: &[TallyEntry], active: &ActiveParam, gate: Gate, counted_at: Timestamp) -> Decision {
    let Some(top) = tally.first() else {
        return Decision::Reject(RejectReason::QuorumNotMet {
            have: 0,
            need: gate.quorum,
        });
    };
    if top.total_weight < gate.quorum {
        return Decision::Reject(RejectReason::QuorumNotMet {
            have: top.total_weight,
            need: gate.quorum,
        });
    }
    let age_secs = top.earliest_cast_at.timestamp.elapsed_since(counted_at);
    if !top
        .earliest_cast_at
        .timestamp
        .has_aged(gate.min_vote_age_secs, counted_at)
    {
        return Decision::Reject(RejectReason::VoteTooYoung {
            age_secs,
            min_age_secs: gate.min_vote_age_secs,
        });
    }
    if top.value == active.value {
        return Decision::Reject(RejectReason::NoChange);
    }
    Decision::Activate(top.value.clone())
}

/// Tracks pending count triggers and performs activations.
pub struct ActivationController {
    gate: EmergencyGate,
    pending: BTreeMap<UnitHash, PendingCount>,
    evaluated: BTreeSet<UnitHash>,
}

impl ActivationController {
    pub fn new(config: &GovernanceConfig) -> Self {
        Self {
            gate: EmergencyGate::new(config),
            pending: BTreeMap::new(),
            evaluated: BTreeSet::new(),
        }
    }

    /// Register a count trigger with the ranked tally as of its ledger point.
    /// Its subject enters `CountRequested`.
    pub fn submit(&mut self, trigger: CountTrigger, tally: Vec<TallyEntry>) -> Result<(), GovernanceError> {
        if self.is_known(&trigger.unit) {
            return Err(GovernanceError::DuplicateTrigger(trigger.unit));
        }
        let leader = tally.into_iter().next();
        tracing::debug!(
            subject = %trigger.subject,
            unit = %trigger.unit,
            path = %trigger.path,
            at = %trigger.point,
            leading_weight = leader.as_ref().map_or(0, |e| e.total_weight),
            "count requested"
        );
        self.pending.insert(trigger.unit, PendingCount { trigger, leader });
        Ok(())
    }

    /// Whether `unit` is pending or was already evaluated.
    pub fn is_known(&self, unit: &UnitHash) -> bool {
        self.pending.contains_key(unit) || self.evaluated.contains(unit)
    }

    pub fn phase(&self, subject: Subject) -> SubjectPhase {
        if self.pending.values().any(|p| p.trigger.subject == subject) {
            SubjectPhase::CountRequested
        } else {
            SubjectPhase::Idle
        }
    }

    pub fn pending(&self) -> impl Iterator<Item = &CountTrigger> {
        self.pending.values().map(|p| &p.trigger)
    }

    pub(crate) fn pending_counts(&self) -> impl Iterator<Item = &PendingCount> {
        self.pending.values()
    }

    pub(crate) fn evaluated(&self) -> &BTreeSet<UnitHash> {
        &self.evaluated
    }

    /// Reinstate the controller's state from before a restart.
    pub(crate) fn restore(&mut self, pending: Vec<PendingCount>, evaluated: Vec<UnitHash>) {
        for count in pending {
            self.pending.insert(count.trigger.unit, count);
        }
        self.evaluated.extend(evaluated);
    }

    /// The trigger for `unit` if it is pending and stable; `None` while it is
    /// pending but not yet stable.
    pub fn ready(
        &self,
        unit: &UnitHash,
        signal: &dyn StabilitySignal,
    ) -> Result<Option<&CountTrigger>, GovernanceError> {
        if self.evaluated.contains(unit) {
            return Err(GovernanceError::DuplicateTrigger(*unit));
        }
        let count = self
            .pending
            .get(unit)
            .ok_or(GovernanceError::UnknownTrigger(*unit))?;
        if !signal.is_stable(unit) {
            return Ok(None);
        }
        Ok(Some(&count.trigger))
    }

    /// Evaluate a stable trigger against the tally taken at submission and,
    /// if it passes, replace the subject's active record in `store` and then
    /// in `state`.
    ///
    /// The trigger is consumed only once the outcome is settled; a storage
    /// failure leaves it pending. The caller persists the consumed trigger
    /// separately from the activation. If that second write is lost, the
    /// trigger is evaluated again after a restart against the same snapshot,
    /// whose leader is by then active, so the repeat ends in
    /// [`RejectReason::NoChange`].
    pub fn conclude<S: ParamStore>(
        &mut self,
        unit: &UnitHash,
        stabilized_at: LedgerPoint,
        state: &mut CommitteeState,
        store: &S,
    ) -> Result<CountOutcome, GovernanceError> {
        let PendingCount { trigger, leader } = self
            .pending
            .get(unit)
            .ok_or(GovernanceError::UnknownTrigger(*unit))?;
        let subject = trigger.subject;
        let gate = self.gate.gate(trigger.path);
        let active = state.get_active(subject)?;

        let outcome = match evaluate(leader.as_slice(), active, gate, trigger.point.timestamp) {
            Decision::Activate(value) => {
                let record = active.successor(value, stabilized_at, *unit);
                store.commit_activation(subject.name(), record.version, &bincode::serialize(&record)?)?;
                tracing::info!(
                    %subject,
                    value = %record.value,
                    version = record.version,
                    path = %trigger.path,
                    trigger = %unit,
                    at = %stabilized_at,
                    "activated"
                );
                state.apply(record.clone());
                CountOutcome::Activated(record)
            }
            Decision::Reject(reason) => {
                tracing::warn!(%subject, path = %trigger.path, trigger = %unit, %reason, "count rejected");
                CountOutcome::Rejected(reason)
            }
        };

        self.pending.remove(unit);
        self.evaluated.insert(*unit);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opgov_types::Decimal;

    fn addr(c: char) -> Address {
        Address::parse(&c.to_string().repeat(32)).unwrap()
    }

    fn numeric(n: u128) -> SubjectValue {
        SubjectValue::Numeric(Decimal::from_integer(n))
    }

    fn entry(value: u128, weight: u128, cast_secs: u64) -> TallyEntry {
        TallyEntry {
            value: numeric(value),
            total_weight: weight,
            earliest_cast_at: LedgerPoint::new(1, Timestamp::new(cast_secs)),
            voters: vec![addr('A')],
        }
    }

    const GATE: Gate = Gate {
        quorum: 100,
        min_vote_age_secs: 60,
    };

    #[test]
    fn empty_tally_misses_quorum() {
        let active = ActiveParam::genesis(Subject::BaseTpsFee, numeric(10));
        assert_eq!(
            evaluate(&[], &active, GATE, Timestamp::new(1_000)),
            Decision::Reject(RejectReason::QuorumNotMet { have: 0, need: 100 })
        );
    }

    #[test]
    fn quorum_is_checked_before_age() {
        let active = ActiveParam::genesis(Subject::BaseTpsFee, numeric(10));
        let tally = [entry(20, 99, 1_000)];
        assert_eq!(
            evaluate(&tally, &active, GATE, Timestamp::new(1_000)),
            Decision::Reject(RejectReason::QuorumNotMet { have: 99, need: 100 })
        );
    }

    #[test]
    fn age_boundary_is_inclusive() {
        let active = ActiveParam::genesis(Subject::BaseTpsFee, numeric(10));
        let tally = [entry(20, 100, 1_000)];
        assert_eq!(
            evaluate(&tally, &active, GATE, Timestamp::new(1_059)),
            Decision::Reject(RejectReason::VoteTooYoung {
                age_secs: 59,
                min_age_secs: 60
            })
        );
        assert_eq!(
            evaluate(&tally, &active, GATE, Timestamp::new(1_060)),
            Decision::Activate(numeric(20))
        );
    }

    #[test]
    fn age_is_checked_before_no_change() {
        let active = ActiveParam::genesis(Subject::BaseTpsFee, numeric(20));
        let tally = [entry(20, 100, 1_000)];
        assert!(matches!(
            evaluate(&tally, &active, GATE, Timestamp::new(1_001)),
            Decision::Reject(RejectReason::VoteTooYoung { .. })
        ));
        assert_eq!(
            evaluate(&tally, &active, GATE, Timestamp::new(2_000)),
            Decision::Reject(RejectReason::NoChange)
        );
    }

    fn trigger(n: u8) -> CountTrigger {
        CountTrigger {
            unit: UnitHash::new([n; 32]),
            subject: Subject::TpsInterval,
            submitter: addr('A'),
            point: LedgerPoint::new(5, Timestamp::new(50)),
            path: ActivationPath::Ordinary,
        }
    }

    #[test]
    fn duplicate_submission_is_refused() {
        let mut controller = ActivationController::new(&GovernanceConfig::default());
        controller.submit(trigger(3), Vec::new()).unwrap();
        assert_eq!(controller.phase(Subject::TpsInterval), SubjectPhase::CountRequested);
        assert_eq!(controller.phase(Subject::OpList), SubjectPhase::Idle);
        assert!(matches!(
            controller.submit(trigger(3), Vec::new()),
            Err(GovernanceError::DuplicateTrigger(_))
        ));
    }

    #[test]
    fn submit_keeps_only_the_leader() {
        let mut controller = ActivationController::new(&GovernanceConfig::default());
        controller
            .submit(trigger(4), vec![entry(20, 300, 10), entry(30, 200, 5)])
            .unwrap();
        let count = controller.pending_counts().next().unwrap();
        assert_eq!(count.leader, Some(entry(20, 300, 10)));
    }

    #[test]
    fn restored_evaluated_trigger_is_a_duplicate() {
        let mut controller = ActivationController::new(&GovernanceConfig::default());
        controller.restore(Vec::new(), vec![UnitHash::new([6; 32])]);
        assert!(controller.is_known(&UnitHash::new([6; 32])));
        assert!(matches!(
            controller.submit(trigger(6), Vec::new()),
            Err(GovernanceError::DuplicateTrigger(_))
        ));
    }
}
