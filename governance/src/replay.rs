//! Replay of stabilized history.
//!
//! History is a sequence of [`LedgerEvent`]s, one JSON object per line. Feeding
//! the same history into a fresh engine must reproduce the same state digest;
//! [`verify_replay`] checks exactly that. Replaying into an engine that already
//! holds part of the history resumes after its applied cursor.

use opgov_store::{GovernanceStore, StabilitySignal, StakeOracle, StoreError};
use opgov_types::{Address, BaseAmount, LedgerPoint, Timestamp, UnitHash};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashSet};
use std::io::BufRead;

use crate::activation::{CountOutcome, CountTrigger};
use crate::committee::{ActiveParam, StateDigest};
use crate::emergency::ActivationPath;
use crate::engine::{GovernanceEngine, UnitContext};
use crate::fees::UnitCommissions;
use crate::messages::{GovernanceMessage, VotePayload};
use crate::subject::Subject;
use crate::vote_ledger::VoteOutcome;
use crate::GovernanceError;

/// One line of a history file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// An address's balance from `index` onwards.
    Balance {
        address: Address,
        index: u64,
        amount: u128,
    },
    Vote {
        unit: UnitHash,
        voter: Address,
        index: u64,
        timestamp: u64,
        subject: String,
        value: JsonValue,
        #[serde(default)]
        burn_fee: u128,
    },
    Count {
        unit: UnitHash,
        submitter: Address,
        index: u64,
        timestamp: u64,
        subject: String,
        #[serde(default)]
        emergency: bool,
    },
    /// `unit` reached stability at (`index`, `timestamp`).
    Stable {
        unit: UnitHash,
        index: u64,
        timestamp: u64,
    },
}

/// Read a history file. Blank lines and lines starting with `#` are skipped.
pub fn parse_history<R: BufRead>(reader: R) -> Result<Vec<LedgerEvent>, GovernanceError> {
    let mut events = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| GovernanceError::Serialization(e.to_string()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let event = serde_json::from_str(trimmed).map_err(|e| {
            GovernanceError::Serialization(format!("history line {}: {e}", lineno + 1))
        })?;
        events.push(event);
    }
    Ok(events)
}

/// What a replay did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub votes_recorded: usize,
    pub votes_stale: usize,
    /// Vote or count units whose message was refused.
    pub messages_refused: usize,
    pub counts_submitted: usize,
    pub activations: Vec<ActiveParam>,
    pub rejections: usize,
    /// Unit events at or below the engine's applied cursor, skipped.
    pub already_applied: usize,
}

/// Balances and stability as declared by the history itself.
#[derive(Default)]
pub struct HistoryLedger {
    balances: BTreeMap<Address, Vec<(u64, BaseAmount)>>,
    stable: HashSet<UnitHash>,
}

impl HistoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_balance(&mut self, address: Address, from_index: u64, amount: u128) {
        let steps = self.balances.entry(address).or_default();
        steps.retain(|(idx, _)| *idx != from_index);
        steps.push((from_index, BaseAmount::new(amount)));
        steps.sort_by_key(|(idx, _)| *idx);
    }

    pub fn mark_stable(&mut self, unit: UnitHash) {
        self.stable.insert(unit);
    }
}

impl StakeOracle for HistoryLedger {
    fn balance_at(&self, address: &Address, at: &LedgerPoint) -> Result<BaseAmount, StoreError> {
        Ok(self
            .balances
            .get(address)
            .and_then(|steps| steps.iter().take_while(|(idx, _)| *idx <= at.index).last())
            .map(|(_, amount)| *amount)
            .unwrap_or(BaseAmount::ZERO))
    }
}

impl StabilitySignal for HistoryLedger {
    fn is_stable(&self, unit: &UnitHash) -> bool {
        self.stable.contains(unit)
    }
}

impl LedgerEvent {
    /// Ledger index of a unit event; `None` for balance declarations.
    pub fn unit_index(&self) -> Option<u64> {
        match self {
            Self::Balance { .. } => None,
            Self::Vote { index, .. } | Self::Count { index, .. } | Self::Stable { index, .. } => {
                Some(*index)
            }
        }
    }
}

/// Feed `events` into `engine` in order.
///
/// Unit events at or below the engine's applied cursor were processed by an
/// earlier run and are skipped, so they are neither recorded nor charged
/// twice. Balance declarations always apply. Refused messages and repeated
/// stability signals are logged and skipped; they never change state. Storage
/// failures abort the replay.
pub fn replay<S: GovernanceStore>(
    engine: &mut GovernanceEngine<S>,
    events: &[LedgerEvent],
) -> Result<ReplaySummary, GovernanceError> {
    let mut ledger = HistoryLedger::new();
    let mut summary = ReplaySummary::default();
    let applied = engine.last_applied_index()?;
    if let Some(applied) = applied {
        tracing::info!(applied, "resuming replay after applied cursor");
    }

    for event in events {
        if let (Some(index), Some(applied)) = (event.unit_index(), applied) {
            if index <= applied {
                summary.already_applied += 1;
                continue;
            }
        }
        match event {
            LedgerEvent::Balance {
                address,
                index,
                amount,
            } => ledger.set_balance(address.clone(), *index, *amount),
            LedgerEvent::Vote {
                unit,
                voter,
                index,
                timestamp,
                subject,
                value,
                burn_fee,
            } => {
                let message = GovernanceMessage::SystemVote(VotePayload {
                    subject: subject.clone(),
                    value: value.clone(),
                });
                let ctx = UnitContext {
                    unit: *unit,
                    author: voter.clone(),
                    point: LedgerPoint::new(*index, Timestamp::new(*timestamp)),
                    commissions: UnitCommissions::default(),
                    burn_fee: BaseAmount::new(*burn_fee),
                };
                match engine.process_message(&ctx, &message, &ledger) {
                    Ok(receipt) => match receipt.vote {
                        Some(VoteOutcome::Stale { .. }) => summary.votes_stale += 1,
                        _ => summary.votes_recorded += 1,
                    },
                    Err(e) if is_refusal(&e) => {
                        tracing::warn!(%unit, %voter, error = %e, "vote refused");
                        summary.messages_refused += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
            LedgerEvent::Count {
                unit,
                submitter,
                index,
                timestamp,
                subject,
                emergency,
            } => {
                let subject: Subject = match subject.parse() {
                    Ok(s) => s,
                    Err(e) => {
                        tracing::warn!(%unit, error = %e, "count refused");
                        summary.messages_refused += 1;
                        continue;
                    }
                };
                let trigger = CountTrigger {
                    unit: *unit,
                    subject,
                    submitter: submitter.clone(),
                    point: LedgerPoint::new(*index, Timestamp::new(*timestamp)),
                    path: ActivationPath::from_flag(*emergency),
                };
                match engine.submit_count(trigger, UnitCommissions::default(), &ledger) {
                    Ok(_) => summary.counts_submitted += 1,
                    Err(e @ GovernanceError::DuplicateTrigger(_)) => {
                        tracing::warn!(%unit, error = %e, "count refused");
                        summary.messages_refused += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
            LedgerEvent::Stable {
                unit,
                index,
                timestamp,
            } => {
                ledger.mark_stable(*unit);
                let at = LedgerPoint::new(*index, Timestamp::new(*timestamp));
                match engine.on_stable(unit, at, &ledger) {
                    Ok(CountOutcome::Activated(record)) => summary.activations.push(record),
                    Ok(CountOutcome::Rejected(_)) => summary.rejections += 1,
                    Ok(CountOutcome::Pending) => {}
                    // Stability of a non-count unit, or a repeated signal.
                    Err(GovernanceError::UnknownTrigger(_)) => {}
                    Err(e @ GovernanceError::DuplicateTrigger(_)) => {
                        tracing::warn!(%unit, error = %e, "ignoring repeated stability signal");
                    }
                    Err(e) => return Err(e),
                }
            }
        }
    }

    Ok(summary)
}

/// Replay `events` and check the resulting state against `expected`.
pub fn verify_replay<S: GovernanceStore>(
    engine: &mut GovernanceEngine<S>,
    events: &[LedgerEvent],
    expected: &StateDigest,
) -> Result<ReplaySummary, GovernanceError> {
    let summary = replay(engine, events)?;
    let actual = engine.digest()?;
    if actual != *expected {
        tracing::error!(%expected, %actual, "replayed state diverges");
        return Err(GovernanceError::ConvergenceViolation {
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(summary)
}

fn is_refusal(e: &GovernanceError) -> bool {
    matches!(
        e,
        GovernanceError::InvalidSubject(_) | GovernanceError::MalformedValue { .. }
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_skips_comments_and_blank_lines() {
        let text = format!(
            "# balances\n\n{}\n{}\n",
            r#"{"type":"balance","address":"AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA","index":0,"amount":5}"#,
            r#"{"type":"count","unit":"0101010101010101010101010101010101010101010101010101010101010101","submitter":"AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA","index":3,"timestamp":30,"subject":"op_list"}"#,
        );
        let events = parse_history(text.as_bytes()).unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[1],
            LedgerEvent::Count {
                emergency: false,
                ..
            }
        ));
    }

    #[test]
    fn bad_line_reports_its_number() {
        let err = parse_history("\n{\"type\":\"nope\"}\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn history_ledger_balances_step_in_ledger_order() {
        let mut ledger = HistoryLedger::new();
        let a = Address::parse(&"A".repeat(32)).unwrap();
        ledger.set_balance(a.clone(), 0, 10);
        ledger.set_balance(a.clone(), 5, 20);
        let at = |i| LedgerPoint::new(i, Timestamp::EPOCH);
        assert_eq!(ledger.balance_at(&a, &at(4)).unwrap().raw(), 10);
        assert_eq!(ledger.balance_at(&a, &at(5)).unwrap().raw(), 20);
    }
}
