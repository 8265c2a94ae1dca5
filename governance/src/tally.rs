//! Ranked aggregation of live votes.
//!
//! Tallies are derived on demand and never stored. Ranking is total: weight
//! descending, then the earliest supporting vote, then canonical value bytes,
//! so every node ranks the same votes identically.

use opgov_store::VoteStore;
use opgov_types::{Address, LedgerPoint};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::subject::Subject;
use crate::value::SubjectValue;
use crate::vote_ledger::{Vote, VoteLedger};
use crate::GovernanceError;

/// Aggregated support for one distinct value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyEntry {
    pub value: SubjectValue,
    pub total_weight: u128,
    /// Cast point of the oldest live vote holding this value.
    pub earliest_cast_at: LedgerPoint,
    /// Supporting voters, sorted.
    pub voters: Vec<Address>,
}

/// Tally of the live votes on `subject`, top-ranked entry first.
pub fn compute_tally<S: VoteStore>(
    ledger: &VoteLedger<'_, S>,
    subject: Subject,
) -> Result<Vec<TallyEntry>, GovernanceError> {
    let entries = rank(ledger.live_votes(subject)?)?;
    tracing::debug!(%subject, values = entries.len(), "tally computed");
    Ok(entries)
}

/// Tally every subject. Subjects are independent, so they are evaluated in
/// parallel.
pub fn tally_all<S: VoteStore + Sync>(
    store: &S,
    committee_size: usize,
) -> Result<BTreeMap<Subject, Vec<TallyEntry>>, GovernanceError> {
    Subject::ALL
        .par_iter()
        .map(|&subject| {
            let ledger = VoteLedger::new(store, committee_size);
            compute_tally(&ledger, subject).map(|entries| (subject, entries))
        })
        .collect()
}

/// Group votes by value, sum their weights and rank the groups.
pub fn rank<I>(votes: I) -> Result<Vec<TallyEntry>, GovernanceError>
where
    I: IntoIterator<Item = Vote>,
{
    let mut groups: BTreeMap<Vec<u8>, TallyEntry> = BTreeMap::new();
    for vote in votes {
        let key = vote.value.canonical_bytes()?;
        match groups.get_mut(&key) {
            Some(entry) => {
                entry.total_weight = entry.total_weight.saturating_add(vote.weight);
                if earlier(&vote.cast_at, &entry.earliest_cast_at) {
                    entry.earliest_cast_at = vote.cast_at;
                }
                entry.voters.push(vote.voter);
            }
            None => {
                groups.insert(
                    key,
                    TallyEntry {
                        value: vote.value,
                        total_weight: vote.weight,
                        earliest_cast_at: vote.cast_at,
                        voters: vec![vote.voter],
                    },
                );
            }
        }
    }

    let mut ranked: Vec<(Vec<u8>, TallyEntry)> = groups.into_iter().collect();
    for (_, entry) in ranked.iter_mut() {
        entry.voters.sort();
    }
    ranked.sort_by(|(ka, a), (kb, b)| {
        b.total_weight
            .cmp(&a.total_weight)
            .then_with(|| point_order(&a.earliest_cast_at, &b.earliest_cast_at))
            .then_with(|| ka.cmp(kb))
    });
    Ok(ranked.into_iter().map(|(_, entry)| entry).collect())
}

fn point_order(a: &LedgerPoint, b: &LedgerPoint) -> Ordering {
    (a.timestamp, a.index).cmp(&(b.timestamp, b.index))
}

fn earlier(a: &LedgerPoint, b: &LedgerPoint) -> bool {
    point_order(a, b) == Ordering::Less
}
