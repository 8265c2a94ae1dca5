//! Stake-weighted governance of the order-provider committee and of system
//! parameters.
//!
//! Flow: stabilized vote units → [`VoteLedger`] → [`compute_tally`] (on demand,
//! when a count unit asks for it) → [`ActivationController`] →
//! [`CommitteeState`], which is mutated exactly once per activation.
//!
//! Counts go through one of two gates: the ordinary path, or the
//! [`EmergencyGate`] path with a smaller quorum and a much shorter minimum
//! vote age. Both end in the same transition.
//!
//! Nothing here reads the wall clock. Every timestamp comes from a stabilized
//! unit, so replaying history is deterministic (see [`replay`]).

pub mod activation;
pub mod committee;
pub mod config;
pub mod emergency;
pub mod engine;
pub mod error;
pub mod fees;
pub mod messages;
pub mod replay;
pub mod subject;
pub mod tally;
pub mod value;
pub mod vote_ledger;

pub use activation::{
    evaluate, ActivationController, CountOutcome, CountTrigger, Decision, PendingCount,
    RejectReason, SubjectPhase,
};
pub use committee::{ActiveParam, CommitteeState, StateDigest};
pub use config::{Gate, Genesis, GovernanceConfig, WeightingMode, DEFAULT_ACTIVATION_COST};
pub use emergency::{ActivationPath, EmergencyGate};
pub use engine::{
    GovernanceEngine, UnitContext, UnitReceipt, EVALUATED_COUNTS_KEY, LAST_APPLIED_KEY,
    PENDING_COUNTS_KEY,
};
pub use error::GovernanceError;
pub use fees::{Charge, UnitCommissions};
pub use messages::{GovernanceMessage, ParsedMessage};
pub use replay::{parse_history, replay, verify_replay, HistoryLedger, LedgerEvent, ReplaySummary};
pub use subject::Subject;
pub use tally::{compute_tally, tally_all, TallyEntry};
pub use value::{CommitteeList, SubjectValue};
pub use vote_ledger::{LiveVotes, Vote, VoteLedger, VoteOutcome};
