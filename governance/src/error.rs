use opgov_store::StoreError;
use opgov_types::UnitHash;
use thiserror::Error;

use crate::subject::Subject;

#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error("unknown governance subject: {0}")]
    InvalidSubject(String),

    #[error("malformed {subject} value: {reason}")]
    MalformedValue { subject: String, reason: String },

    #[error("count trigger {0} is not pending")]
    UnknownTrigger(UnitHash),

    #[error("count trigger {0} was already submitted")]
    DuplicateTrigger(UnitHash),

    #[error("no active value for {0}")]
    MissingActiveValue(Subject),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// Replaying stabilized history produced a different state than the live
    /// one. Indicates a protocol or implementation bug, never a user error.
    #[error("convergence violation: expected state {expected}, replay produced {actual}")]
    ConvergenceViolation { expected: String, actual: String },
}

impl GovernanceError {
    pub(crate) fn malformed(subject: Subject, reason: impl Into<String>) -> Self {
        Self::MalformedValue {
            subject: subject.name().to_string(),
            reason: reason.into(),
        }
    }
}

impl From<bincode::Error> for GovernanceError {
    fn from(e: bincode::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
