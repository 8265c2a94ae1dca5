//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::migration::Migrator;
use crate::LmdbError;

/// Number of named databases opened by [`LmdbEnvironment::open`].
const DATABASE_COUNT: u32 = 4;

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    votes_db: Database<Bytes, Bytes>,
    active_db: Database<Bytes, Bytes>,
    history_db: Database<Bytes, Bytes>,
    meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path and bring its
    /// schema up to date.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;
        // SAFETY: the environment is opened once per path by this process and
        // the memory map is never resized while transactions are alive.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(DATABASE_COUNT)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let votes_db = env.create_database(&mut wtxn, Some("votes"))?;
        let active_db = env.create_database(&mut wtxn, Some("active_params"))?;
        let history_db = env.create_database(&mut wtxn, Some("param_history"))?;
        let meta_db = env.create_database(&mut wtxn, Some("meta"))?;
        wtxn.commit()?;

        tracing::debug!(path = %path.display(), map_size, "opened LMDB environment");

        let this = Self {
            env: Arc::new(env),
            votes_db,
            active_db,
            history_db,
            meta_db,
        };
        Migrator::run(&this.governance_store())?;
        Ok(this)
    }

    /// A handle implementing every governance storage trait.
    pub fn governance_store(&self) -> LmdbGovernanceStore {
        LmdbGovernanceStore {
            env: Arc::clone(&self.env),
            votes_db: self.votes_db,
            active_db: self.active_db,
            history_db: self.history_db,
            meta_db: self.meta_db,
        }
    }

    pub fn env(&self) -> &Env {
        &self.env
    }
}

/// LMDB-backed implementation of `VoteStore`, `ParamStore` and `MetaStore`.
///
/// Cheap to clone; all handles share one environment.
#[derive(Clone)]
pub struct LmdbGovernanceStore {
    pub(crate) env: Arc<Env>,
    pub(crate) votes_db: Database<Bytes, Bytes>,
    pub(crate) active_db: Database<Bytes, Bytes>,
    pub(crate) history_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

/// Composite key `subject ‖ 0x00 ‖ suffix`. Subject names never contain NUL.
pub(crate) fn subject_key(subject: &str, suffix: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(subject.len() + 1 + suffix.len());
    key.extend_from_slice(subject.as_bytes());
    key.push(0);
    key.extend_from_slice(suffix);
    key
}
