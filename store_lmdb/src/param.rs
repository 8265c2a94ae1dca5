//! LMDB implementation of ParamStore.

use opgov_store::{ParamStore, StoreError};

use crate::environment::{subject_key, LmdbGovernanceStore};
use crate::LmdbError;

impl ParamStore for LmdbGovernanceStore {
    fn get_active(&self, subject: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .active_db
            .get(&rtxn, subject.as_bytes())
            .map_err(LmdbError::from)?;
        Ok(val.map(|v| v.to_vec()))
    }

    fn commit_activation(
        &self,
        subject: &str,
        version: u64,
        data: &[u8],
    ) -> Result<(), StoreError> {
        let history_key = subject_key(subject, &version.to_be_bytes());
        // Both writes share one transaction: either the new record is active
        // and in history, or neither.
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.active_db
            .put(&mut wtxn, subject.as_bytes(), data)
            .map_err(LmdbError::from)?;
        self.history_db
            .put(&mut wtxn, &history_key, data)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn iter_history(&self, subject: &str) -> Result<Vec<(u64, Vec<u8>)>, StoreError> {
        let prefix = subject_key(subject, &[]);
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self
            .history_db
            .prefix_iter(&rtxn, &prefix)
            .map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for entry in iter {
            let (key, val) = entry.map_err(LmdbError::from)?;
            let suffix = &key[prefix.len()..];
            let version: [u8; 8] = suffix.try_into().map_err(|_| {
                StoreError::Corruption(format!("history key for {subject} has bad version"))
            })?;
            results.push((u64::from_be_bytes(version), val.to_vec()));
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmdbEnvironment;

    #[test]
    fn activation_updates_active_and_history() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 1 << 20).unwrap();
        let store = env.governance_store();

        assert_eq!(store.get_active("base_tps_fee").unwrap(), None);

        store.commit_activation("base_tps_fee", 0, b"10").unwrap();
        store.commit_activation("base_tps_fee", 1, b"100.3").unwrap();

        assert_eq!(
            store.get_active("base_tps_fee").unwrap(),
            Some(b"100.3".to_vec())
        );
        assert_eq!(
            store.iter_history("base_tps_fee").unwrap(),
            vec![(0, b"10".to_vec()), (1, b"100.3".to_vec())]
        );
    }

    #[test]
    fn history_orders_versions_numerically() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 1 << 20).unwrap();
        let store = env.governance_store();

        for v in [256u64, 2, 1] {
            store.commit_activation("op_list", v, &v.to_le_bytes()).unwrap();
        }
        let versions: Vec<u64> = store
            .iter_history("op_list")
            .unwrap()
            .into_iter()
            .map(|(v, _)| v)
            .collect();
        assert_eq!(versions, vec![1, 2, 256]);
    }
}
