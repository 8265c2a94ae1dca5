//! The governance engine — single entry point for stabilized governance units.
//!
//! Units must be fed in ledger order. Every decision depends only on the units
//! and the explicit ledger points passed in, so two engines fed the same
//! history end with identical [`CommitteeState`] digests.

use opgov_store::{GovernanceStore, StabilitySignal, StakeOracle, StoreError};
use opgov_types::{Address, BaseAmount, LedgerPoint, UnitHash};
use std::collections::BTreeMap;

use crate::activation::{ActivationController, CountOutcome, CountTrigger, PendingCount, SubjectPhase};
use crate::committee::{ActiveParam, CommitteeState, StateDigest};
use crate::config::{Genesis, GovernanceConfig, WeightingMode};
use crate::fees::{Charge, UnitCommissions};
use crate::messages::{GovernanceMessage, ParsedMessage};
use crate::subject::Subject;
use crate::tally::{self, TallyEntry};
use crate::value::{CommitteeList, SubjectValue};
use crate::vote_ledger::{Vote, VoteLedger, VoteOutcome};
use crate::GovernanceError;

/// Meta key of the pending count triggers and their tally snapshots.
pub const PENDING_COUNTS_KEY: &str = "pending_counts";
/// Meta key of the count triggers already evaluated.
pub const EVALUATED_COUNTS_KEY: &str = "evaluated_counts";
/// Meta key of the highest ledger index applied so far.
pub const LAST_APPLIED_KEY: &str = "last_applied_index";

/// Ledger-side facts about the unit carrying a governance message.
#[derive(Clone, Debug)]
pub struct UnitContext {
    pub unit: UnitHash,
    pub author: Address,
    pub point: LedgerPoint,
    pub commissions: UnitCommissions,
    /// Optional extra burn attached by a voter.
    pub burn_fee: BaseAmount,
}

/// What processing a governance unit did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitReceipt {
    pub charge: Charge,
    /// Set for vote units.
    pub vote: Option<VoteOutcome>,
}

pub struct GovernanceEngine<S> {
    store: S,
    config: GovernanceConfig,
    state: CommitteeState,
    controller: ActivationController,
}

impl<S: GovernanceStore> GovernanceEngine<S> {
    /// Open an engine over `store`, bootstrapping from `genesis` on first use.
    pub fn open(store: S, config: GovernanceConfig, genesis: Option<&Genesis>) -> Result<Self, GovernanceError> {
        config.validate()?;
        let genesis_values = match genesis {
            Some(g) => g.values(config.committee_size)?,
            None => Vec::new(),
        };
        let state = CommitteeState::load(&store, &genesis_values)?;
        let committee = state.committee()?;
        if committee.len() != config.committee_size {
            return Err(GovernanceError::Config(format!(
                "stored committee has {} members, configuration expects {}",
                committee.len(),
                config.committee_size
            )));
        }

        let mut controller = ActivationController::new(&config);
        let pending: Vec<PendingCount> = match store.get_meta(PENDING_COUNTS_KEY)? {
            Some(bytes) => bincode::deserialize(&bytes)?,
            None => Vec::new(),
        };
        let evaluated: Vec<UnitHash> = match store.get_meta(EVALUATED_COUNTS_KEY)? {
            Some(bytes) => bincode::deserialize(&bytes)?,
            None => Vec::new(),
        };
        controller.restore(pending, evaluated);

        let engine = Self {
            store,
            config,
            state,
            controller,
        };
        let last_applied = engine.last_applied_index()?;
        tracing::info!(
            network = engine.config.network.as_str(),
            committee_size = engine.config.committee_size,
            ?last_applied,
            "governance engine opened"
        );
        Ok(engine)
    }

    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn state(&self) -> &CommitteeState {
        &self.state
    }

    /// Process the governance message carried by a stabilized unit.
    pub fn process_message(
        &mut self,
        ctx: &UnitContext,
        message: &GovernanceMessage,
        oracle: &dyn StakeOracle,
    ) -> Result<UnitReceipt, GovernanceError> {
        match message.parse(self.config.committee_size)? {
            ParsedMessage::Vote { subject, value } => {
                let outcome = self.record_vote(ctx.unit, &ctx.author, subject, value, ctx.point, oracle)?;
                Ok(UnitReceipt {
                    charge: Charge::vote(ctx.commissions, ctx.burn_fee),
                    vote: Some(outcome),
                })
            }
            ParsedMessage::Count { subject, path } => {
                let trigger = CountTrigger {
                    unit: ctx.unit,
                    subject,
                    submitter: ctx.author.clone(),
                    point: ctx.point,
                    path,
                };
                Ok(UnitReceipt {
                    charge: self.submit_count(trigger, ctx.commissions, oracle)?,
                    vote: None,
                })
            }
        }
    }

    /// Record a vote weighted by the voter's balance at the cast point.
    pub fn record_vote(
        &mut self,
        unit: UnitHash,
        voter: &Address,
        subject: Subject,
        value: SubjectValue,
        cast_at: LedgerPoint,
        oracle: &dyn StakeOracle,
    ) -> Result<VoteOutcome, GovernanceError> {
        let weight = oracle.balance_at(voter, &cast_at)?.raw();
        let outcome = self.ledger().record_vote(subject, voter, value, weight, cast_at, unit)?;
        self.advance_cursor(cast_at)?;
        Ok(outcome)
    }

    /// Register a count trigger and return what its submitter is charged.
    ///
    /// Units arrive in ledger order, so the vote ledger now holds exactly the
    /// votes visible at `trigger.point`; that tally is the one the count is
    /// later evaluated against. The activation cost is due even if the count
    /// is later rejected.
    pub fn submit_count(
        &mut self,
        trigger: CountTrigger,
        commissions: UnitCommissions,
        oracle: &dyn StakeOracle,
    ) -> Result<Charge, GovernanceError> {
        if self.controller.is_known(&trigger.unit) {
            return Err(GovernanceError::DuplicateTrigger(trigger.unit));
        }
        let point = trigger.point;
        let tally = self.weighted_tally(trigger.subject, &point, oracle)?;
        self.controller.submit(trigger, tally)?;
        self.persist_counts()?;
        self.advance_cursor(point)?;
        Ok(Charge::count(
            commissions,
            BaseAmount::new(self.config.activation_cost),
        ))
    }

    /// Evaluate the count trigger `unit` once it is stable.
    ///
    /// Returns [`CountOutcome::Pending`] while `signal` does not report the
    /// unit stable. A trigger already evaluated is
    /// [`GovernanceError::DuplicateTrigger`], across restarts too.
    pub fn on_stable(
        &mut self,
        unit: &UnitHash,
        stabilized_at: LedgerPoint,
        signal: &dyn StabilitySignal,
    ) -> Result<CountOutcome, GovernanceError> {
        if self.controller.ready(unit, signal)?.is_none() {
            tracing::debug!(%unit, "count trigger not stable yet");
            return Ok(CountOutcome::Pending);
        }

        let outcome =
            self.controller
                .conclude(unit, stabilized_at, &mut self.state, &self.store)?;
        self.persist_counts()?;
        self.advance_cursor(stabilized_at)?;
        Ok(outcome)
    }

    pub fn get_active(&self, subject: Subject) -> Result<&ActiveParam, GovernanceError> {
        self.state.get_active(subject)
    }

    pub fn committee(&self) -> Result<&CommitteeList, GovernanceError> {
        self.state.committee()
    }

    pub fn committee_at(&self, point: &LedgerPoint) -> Result<&CommitteeList, GovernanceError> {
        self.state.committee_at(point)
    }

    pub fn phase(&self, subject: Subject) -> SubjectPhase {
        self.controller.phase(subject)
    }

    pub fn pending_counts(&self) -> impl Iterator<Item = &CountTrigger> {
        self.controller.pending()
    }

    /// Tally of `subject` using the weights frozen into the votes.
    pub fn tally(&self, subject: Subject) -> Result<Vec<TallyEntry>, GovernanceError> {
        tally::compute_tally(&self.ledger(), subject)
    }

    pub fn digest(&self) -> Result<StateDigest, GovernanceError> {
        self.state.digest()
    }

    pub fn last_applied_index(&self) -> Result<Option<u64>, GovernanceError> {
        match self.store.get_meta(LAST_APPLIED_KEY)? {
            Some(bytes) => {
                let arr: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    StoreError::Corruption(format!("{LAST_APPLIED_KEY} has unexpected byte length"))
                })?;
                Ok(Some(u64::from_be_bytes(arr)))
            }
            None => Ok(None),
        }
    }

    fn ledger(&self) -> VoteLedger<'_, S> {
        VoteLedger::new(&self.store, self.config.committee_size)
    }

    /// Tally for a count at `counted_at`, re-weighting votes when the
    /// configuration weighs stake at count time. Only meaningful while the
    /// ledger has not moved past `counted_at`.
    fn weighted_tally(
        &self,
        subject: Subject,
        counted_at: &LedgerPoint,
        oracle: &dyn StakeOracle,
    ) -> Result<Vec<TallyEntry>, GovernanceError> {
        let votes = self.ledger().live_votes(subject)?;
        match self.config.weighting {
            WeightingMode::AtCast => tally::rank(votes),
            WeightingMode::AtCount => {
                let reweighted = votes
                    .map(|mut vote| -> Result<Vote, GovernanceError> {
                        vote.weight = oracle.balance_at(&vote.voter, counted_at)?.raw();
                        Ok(vote)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                tally::rank(reweighted)
            }
        }
    }

    fn persist_counts(&self) -> Result<(), GovernanceError> {
        let pending: Vec<&PendingCount> = self.controller.pending_counts().collect();
        self.store
            .put_meta(PENDING_COUNTS_KEY, &bincode::serialize(&pending)?)?;
        let evaluated: Vec<&UnitHash> = self.controller.evaluated().iter().collect();
        self.store
            .put_meta(EVALUATED_COUNTS_KEY, &bincode::serialize(&evaluated)?)?;
        Ok(())
    }

    fn advance_cursor(&self, point: LedgerPoint) -> Result<(), GovernanceError> {
        if self.last_applied_index()?.map_or(true, |last| point.index > last) {
            self.store
                .put_meta(LAST_APPLIED_KEY, &point.index.to_be_bytes())?;
        }
        Ok(())
    }
}

impl<S: GovernanceStore + Sync> GovernanceEngine<S> {
    /// Tally every subject in parallel.
    pub fn tally_all(&self) -> Result<BTreeMap<Subject, Vec<TallyEntry>>, GovernanceError> {
        tally::tally_all(&self.store, self.config.committee_size)
    }
}

impl UnitContext {
    /// Context for a unit with no commissions or burn fee.
    pub fn new(unit: UnitHash, author: Address, point: LedgerPoint) -> Self {
        Self {
            unit,
            author,
            point,
            commissions: UnitCommissions::default(),
            burn_fee: BaseAmount::ZERO,
        }
    }
}
