//! Nullable store — thread-safe in-memory storage for testing.

use opgov_store::{MetaStore, ParamStore, StoreError, VoteStore};
use opgov_types::Address;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// An in-memory implementation of every governance storage trait.
///
/// Uses ordered maps so iteration order matches the LMDB backend.
#[derive(Default)]
pub struct NullStore {
    votes: Mutex<BTreeMap<(String, Address), Vec<u8>>>,
    active: Mutex<BTreeMap<String, Vec<u8>>>,
    history: Mutex<BTreeMap<(String, u64), Vec<u8>>>,
    meta: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of live votes across all subjects.
    pub fn vote_count(&self) -> usize {
        self.votes.lock().unwrap().len()
    }
}

impl VoteStore for NullStore {
    fn put_vote(&self, subject: &str, voter: &Address, data: &[u8]) -> Result<(), StoreError> {
        self.votes
            .lock()
            .unwrap()
            .insert((subject.to_string(), voter.clone()), data.to_vec());
        Ok(())
    }

    fn get_vote(&self, subject: &str, voter: &Address) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self
            .votes
            .lock()
            .unwrap()
            .get(&(subject.to_string(), voter.clone()))
            .cloned())
    }

    fn iter_votes(&self, subject: &str) -> Result<Vec<(Address, Vec<u8>)>, StoreError> {
        Ok(self
            .votes
            .lock()
            .unwrap()
            .iter()
            .filter(|((s, _), _)| s == subject)
            .map(|((_, voter), data)| (voter.clone(), data.clone()))
            .collect())
    }
}

impl ParamStore for NullStore {
    fn get_active(&self, subject: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.active.lock().unwrap().get(subject).cloned())
    }

    fn commit_activation(
        &self,
        subject: &str,
        version: u64,
        data: &[u8],
    ) -> Result<(), StoreError> {
        let mut active = self.active.lock().unwrap();
        let mut history = self.history.lock().unwrap();
        active.insert(subject.to_string(), data.to_vec());
        history.insert((subject.to_string(), version), data.to_vec());
        Ok(())
    }

    fn iter_history(&self, subject: &str) -> Result<Vec<(u64, Vec<u8>)>, StoreError> {
        Ok(self
            .history
            .lock()
            .unwrap()
            .iter()
            .filter(|((s, _), _)| s == subject)
            .map(|((_, version), data)| (*version, data.clone()))
            .collect())
    }
}

impl MetaStore for NullStore {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.meta
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.meta.lock().unwrap().get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(c: char) -> Address {
        Address::parse(&c.to_string().repeat(32)).unwrap()
    }

    #[test]
    fn votes_are_keyed_by_subject_and_voter() {
        let store = NullStore::new();
        store.put_vote("op_list", &addr('A'), b"1").unwrap();
        store.put_vote("op_list", &addr('A'), b"2").unwrap();
        store.put_vote("base_tps_fee", &addr('A'), b"3").unwrap();

        assert_eq!(store.vote_count(), 2);
        assert_eq!(store.iter_votes("op_list").unwrap(), vec![(addr('A'), b"2".to_vec())]);
    }

    #[test]
    fn schema_version_defaults_to_zero() {
        let store = NullStore::new();
        assert_eq!(store.get_schema_version().unwrap(), 0);
        store.set_schema_version(3).unwrap();
        assert_eq!(store.get_schema_version().unwrap(), 3);
    }
}
