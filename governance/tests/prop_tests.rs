use proptest::prelude::*;
use std::collections::BTreeMap;

use opgov_governance::tally::rank;
use opgov_governance::{compute_tally, Subject, SubjectValue, Vote, VoteLedger};
use opgov_nullables::NullStore;
use opgov_types::{Address, Decimal, LedgerPoint, Timestamp, UnitHash};

const VOTERS: &[char] = &['A', 'B', 'C', 'D', 'E', 'F'];

fn addr(i: usize) -> Address {
    Address::parse(&VOTERS[i].to_string().repeat(32)).unwrap()
}

fn value(v: u8) -> SubjectValue {
    SubjectValue::Numeric(Decimal::from_integer(v as u128))
}

fn ballot() -> impl Strategy<Value = (usize, u8, u128, u64)> {
    (0..VOTERS.len(), 0u8..4, 0u128..1_000_000, 0u64..10_000)
}

proptest! {
    /// Tally weight equals the weight of each voter's latest vote, counted once.
    #[test]
    fn tally_counts_latest_vote_per_voter(ballots in prop::collection::vec(ballot(), 1..40)) {
        let store = NullStore::new();
        let ledger = VoteLedger::new(&store, 3);
        let mut latest: BTreeMap<usize, (u8, u128)> = BTreeMap::new();

        for (i, (voter, v, weight, secs)) in ballots.iter().enumerate() {
            let point = LedgerPoint::new(i as u64 + 1, Timestamp::new(*secs));
            ledger
                .record_vote(Subject::BaseTpsFee, &addr(*voter), value(*v), *weight, point, UnitHash::ZERO)
                .unwrap();
            latest.insert(*voter, (*v, *weight));
        }

        let tally = compute_tally(&ledger, Subject::BaseTpsFee).unwrap();
        let total: u128 = tally.iter().map(|e| e.total_weight).sum();
        let expected: u128 = latest.values().map(|(_, w)| *w).sum();
        prop_assert_eq!(total, expected);

        let voters: usize = tally.iter().map(|e| e.voters.len()).sum();
        prop_assert_eq!(voters, latest.len());

        for entry in &tally {
            let want: u128 = latest
                .values()
                .filter(|(v, _)| value(*v) == entry.value)
                .map(|(_, w)| *w)
                .sum();
            prop_assert_eq!(entry.total_weight, want);
        }
    }

    /// Ranking does not depend on the order votes are presented in.
    #[test]
    fn ranking_is_order_independent(
        ballots in prop::collection::vec(ballot(), 1..20),
        rotate in 0usize..20,
    ) {
        let mut votes: Vec<Vote> = ballots
            .iter()
            .enumerate()
            .map(|(i, (_, v, weight, secs))| Vote {
                subject: Subject::TpsInterval,
                voter: addr(i % VOTERS.len()),
                value: value(*v + 1),
                cast_at: LedgerPoint::new(i as u64, Timestamp::new(*secs)),
                weight: *weight,
                unit: UnitHash::ZERO,
            })
            .collect();
        let forward = rank(votes.clone()).unwrap();
        let len = votes.len();
        votes.rotate_left(rotate % len);
        votes.reverse();
        let shuffled = rank(votes).unwrap();
        prop_assert_eq!(forward, shuffled);
    }

    /// The top-ranked value carries the largest total weight.
    #[test]
    fn top_entry_has_max_weight(ballots in prop::collection::vec(ballot(), 1..20)) {
        let votes: Vec<Vote> = ballots
            .iter()
            .enumerate()
            .map(|(i, (voter, v, weight, secs))| Vote {
                subject: Subject::TpsInterval,
                voter: addr(*voter),
                value: value(*v + 1),
                cast_at: LedgerPoint::new(i as u64, Timestamp::new(*secs)),
                weight: *weight,
                unit: UnitHash::ZERO,
            })
            .collect();
        let tally = rank(votes).unwrap();
        let max = tally.iter().map(|e| e.total_weight).max().unwrap();
        prop_assert_eq!(tally[0].total_weight, max);
    }
}
