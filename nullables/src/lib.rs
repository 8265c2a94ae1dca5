//! Nullable infrastructure for deterministic testing.
//!
//! Every collaborator of the governance engine (ledger clock, balances,
//! stability signal, storage) is abstracted behind a trait. This crate
//! provides test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem or network

pub mod clock;
pub mod ledger;
pub mod store;

pub use clock::NullClock;
pub use ledger::{NullStability, NullStakeOracle};
pub use store::NullStore;
