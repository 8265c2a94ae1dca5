//! Durable record of the latest vote per (subject, voter).

use opgov_store::VoteStore;
use opgov_types::{Address, LedgerPoint, UnitHash};
use serde::{Deserialize, Serialize};

use crate::subject::Subject;
use crate::value::SubjectValue;
use crate::GovernanceError;

/// A live vote.
///
/// Votes are never mutated: a newer vote by the same voter on the same subject
/// replaces the stored record wholesale.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub subject: Subject,
    pub voter: Address,
    pub value: SubjectValue,
    pub cast_at: LedgerPoint,
    /// Stake at cast time.
    pub weight: u128,
    /// The unit that carried the vote.
    pub unit: UnitHash,
}

/// Result of recording a vote.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Stored as the voter's live vote; `superseded` is the value it replaced.
    Recorded { superseded: Option<SubjectValue> },
    /// Ignored: the stored vote is at the same or a later ledger position.
    Stale { live_at: LedgerPoint },
}

/// View over a [`VoteStore`] enforcing the one-live-vote-per-voter rule.
pub struct VoteLedger<'a, S> {
    store: &'a S,
    committee_size: usize,
}

impl<'a, S: VoteStore> VoteLedger<'a, S> {
    pub fn new(store: &'a S, committee_size: usize) -> Self {
        Self {
            store,
            committee_size,
        }
    }

    /// Store `voter`'s vote on `subject`, replacing any earlier one.
    ///
    /// The value is validated before anything is written; a malformed vote
    /// leaves the ledger untouched. Supersession is decided by ledger order:
    /// a vote that is not strictly newer than the live one is ignored.
    pub fn record_vote(
        &self,
        subject: Subject,
        voter: &Address,
        value: SubjectValue,
        weight: u128,
        cast_at: LedgerPoint,
        unit: UnitHash,
    ) -> Result<VoteOutcome, GovernanceError> {
        value.validate(subject, self.committee_size)?;

        let previous = self.get_vote(subject, voter)?;
        if let Some(prev) = &previous {
            if prev.cast_at.index >= cast_at.index {
                tracing::warn!(
                    %subject,
                    %voter,
                    live = %prev.cast_at,
                    incoming = %cast_at,
                    "ignoring stale vote"
                );
                return Ok(VoteOutcome::Stale {
                    live_at: prev.cast_at,
                });
            }
        }

        let vote = Vote {
            subject,
            voter: voter.clone(),
            value,
            cast_at,
            weight,
            unit,
        };
        let bytes = bincode::serialize(&vote)?;
        self.store.put_vote(subject.name(), voter, &bytes)?;

        tracing::debug!(%subject, %voter, value = %vote.value, weight, at = %cast_at, "vote recorded");
        Ok(VoteOutcome::Recorded {
            superseded: previous.map(|p| p.value),
        })
    }

    pub fn get_vote(&self, subject: Subject, voter: &Address) -> Result<Option<Vote>, GovernanceError> {
        self.store
            .get_vote(subject.name(), voter)?
            .map(|bytes| decode_vote(subject, &bytes))
            .transpose()
    }

    /// Current votes on `subject`, ordered by cast time ascending.
    ///
    /// The returned sequence is finite and can be restarted by cloning it or
    /// calling this again; it reflects the ledger at the time of the call.
    pub fn live_votes(&self, subject: Subject) -> Result<LiveVotes, GovernanceError> {
        let mut votes = self
            .store
            .iter_votes(subject.name())?
            .into_iter()
            .map(|(_, bytes)| decode_vote(subject, &bytes))
            .collect::<Result<Vec<_>, _>>()?;
        votes.sort_by(|a, b| {
            (a.cast_at.timestamp, a.cast_at.index, &a.voter)
                .cmp(&(b.cast_at.timestamp, b.cast_at.index, &b.voter))
        });
        Ok(LiveVotes {
            inner: votes.into_iter(),
        })
    }
}

fn decode_vote(subject: Subject, bytes: &[u8]) -> Result<Vote, GovernanceError> {
    let vote: Vote = bincode::deserialize(bytes)?;
    if vote.subject != subject {
        return Err(GovernanceError::Serialization(format!(
            "vote stored under {subject} belongs to {}",
            vote.subject
        )));
    }
    Ok(vote)
}

/// Ordered snapshot of the live votes on one subject.
#[derive(Clone, Debug)]
pub struct LiveVotes {
    inner: std::vec::IntoIter<Vote>,
}

impl Iterator for LiveVotes {
    type Item = Vote;

    fn next(&mut self) -> Option<Vote> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for LiveVotes {}
