use thiserror::Error;

/// Errors produced by value and record operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("value mismatch: expected {expected}, got {actual}")]
    ValueMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("record has no '{0}' entry")]
    MissingReservedKey(&'static str),
}
