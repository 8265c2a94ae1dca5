//! Live-vote storage trait.

use crate::StoreError;
use opgov_types::Address;

/// Durable record of the latest vote per (subject, voter).
///
/// Keys are the subject's wire name plus the voter address. Writing a vote for
/// an existing key replaces it.
pub trait VoteStore {
    /// Store (or replace) the live vote of `voter` on `subject`.
    fn put_vote(&self, subject: &str, voter: &Address, data: &[u8]) -> Result<(), StoreError>;

    /// Get a specific voter's live vote on a subject.
    fn get_vote(&self, subject: &str, voter: &Address) -> Result<Option<Vec<u8>>, StoreError>;

    /// Get all live votes on a subject, ordered by voter address.
    fn iter_votes(&self, subject: &str) -> Result<Vec<(Address, Vec<u8>)>, StoreError>;
}
