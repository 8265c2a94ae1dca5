//! Fundamental types for order-provider governance.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! addresses, unit hashes, timestamps and ledger points, base-asset amounts,
//! exact decimals, and network identifiers.

pub mod address;
pub mod amount;
pub mod decimal;
pub mod error;
pub mod hash;
pub mod network;
pub mod time;

pub use address::Address;
pub use amount::{BaseAmount, BASE_UNIT};
pub use decimal::Decimal;
pub use error::TypesError;
pub use hash::UnitHash;
pub use network::NetworkId;
pub use time::{LedgerPoint, Timestamp};
