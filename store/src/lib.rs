//! Abstract storage traits for order-provider governance.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The governance engine depends only on the traits. Records are
//! opaque bytes here; the engine owns their encoding.
//!
//! The [`oracle`] module holds the read-only views of the surrounding ledger
//! that the engine consumes but does not own (balances, stability).

pub mod error;
pub mod meta;
pub mod oracle;
pub mod param;
pub mod vote;

pub use error::StoreError;
pub use meta::MetaStore;
pub use oracle::{StabilitySignal, StakeOracle};
pub use param::ParamStore;
pub use vote::VoteStore;

/// Everything the governance engine persists.
pub trait GovernanceStore: VoteStore + ParamStore + MetaStore {}

impl<T: VoteStore + ParamStore + MetaStore> GovernanceStore for T {}
