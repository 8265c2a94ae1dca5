//! LMDB storage backend for order-provider governance.
//!
//! Implements the storage traits from `opgov-store` using the `heed` LMDB
//! bindings. Each logical store maps to a named database within a single
//! environment.

pub mod environment;
pub mod error;
pub mod meta;
pub mod migration;
pub mod param;
pub mod vote;

pub use environment::{LmdbEnvironment, LmdbGovernanceStore};
pub use error::LmdbError;
