//! LMDB implementation of VoteStore.

use opgov_store::{StoreError, VoteStore};
use opgov_types::Address;

use crate::environment::{subject_key, LmdbGovernanceStore};
use crate::LmdbError;

impl VoteStore for LmdbGovernanceStore {
    fn put_vote(&self, subject: &str, voter: &Address, data: &[u8]) -> Result<(), StoreError> {
        let key = subject_key(subject, voter.as_bytes());
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.votes_db
            .put(&mut wtxn, &key, data)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_vote(&self, subject: &str, voter: &Address) -> Result<Option<Vec<u8>>, StoreError> {
        let key = subject_key(subject, voter.as_bytes());
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self.votes_db.get(&rtxn, &key).map_err(LmdbError::from)?;
        Ok(val.map(|v| v.to_vec()))
    }

    fn iter_votes(&self, subject: &str) -> Result<Vec<(Address, Vec<u8>)>, StoreError> {
        let prefix = subject_key(subject, &[]);
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self
            .votes_db
            .prefix_iter(&rtxn, &prefix)
            .map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for entry in iter {
            let (key, val) = entry.map_err(LmdbError::from)?;
            let voter = std::str::from_utf8(&key[prefix.len()..])
                .map_err(|e| LmdbError::Serialization(e.to_string()))?;
            let voter = Address::parse(voter)
                .map_err(|e| StoreError::Corruption(format!("vote key: {e}")))?;
            results.push((voter, val.to_vec()));
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmdbEnvironment;

    fn addr(c: char) -> Address {
        Address::parse(&c.to_string().repeat(32)).unwrap()
    }

    #[test]
    fn put_get_and_replace_vote() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 1 << 20).unwrap();
        let store = env.governance_store();

        assert_eq!(store.get_vote("op_list", &addr('A')).unwrap(), None);
        store.put_vote("op_list", &addr('A'), b"first").unwrap();
        store.put_vote("op_list", &addr('A'), b"second").unwrap();
        assert_eq!(
            store.get_vote("op_list", &addr('A')).unwrap(),
            Some(b"second".to_vec())
        );
    }

    #[test]
    fn iter_votes_is_scoped_to_subject() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 1 << 20).unwrap();
        let store = env.governance_store();

        store.put_vote("op_list", &addr('B'), b"b").unwrap();
        store.put_vote("op_list", &addr('A'), b"a").unwrap();
        store.put_vote("base_tps_fee", &addr('C'), b"c").unwrap();

        let votes = store.iter_votes("op_list").unwrap();
        assert_eq!(votes.len(), 2);
        assert_eq!(votes[0], (addr('A'), b"a".to_vec()));
        assert_eq!(votes[1], (addr('B'), b"b".to_vec()));
        assert_eq!(store.iter_votes("tps_interval").unwrap(), vec![]);
    }

    #[test]
    fn votes_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let env = LmdbEnvironment::open(dir.path(), 1 << 20).unwrap();
            env.governance_store()
                .put_vote("op_list", &addr('D'), b"kept")
                .unwrap();
        }
        let env = LmdbEnvironment::open(dir.path(), 1 << 20).unwrap();
        assert_eq!(
            env.governance_store().get_vote("op_list", &addr('D')).unwrap(),
            Some(b"kept".to_vec())
        );
    }
}
