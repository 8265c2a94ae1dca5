//! Active system-parameter storage trait.

use crate::StoreError;

/// Versioned record store of active parameter values, keyed by subject.
///
/// Besides the current record, every activated version is kept so that the
/// committee in force at any past ledger point can be reconstructed.
pub trait ParamStore {
    /// Get the active record for a subject.
    fn get_active(&self, subject: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Atomically make `data` the active record of `subject` and append it to
    /// the subject's history under `version`.
    fn commit_activation(&self, subject: &str, version: u64, data: &[u8])
        -> Result<(), StoreError>;

    /// All historical records of a subject, ascending by version.
    fn iter_history(&self, subject: &str) -> Result<Vec<(u64, Vec<u8>)>, StoreError>;
}
