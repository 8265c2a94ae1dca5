//! Errors raised while parsing fundamental types.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid decimal: {0}")]
    InvalidDecimal(String),

    #[error("invalid unit hash: {0}")]
    InvalidUnitHash(String),

    #[error("unknown network: {0}")]
    UnknownNetwork(String),
}
