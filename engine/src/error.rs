//! Error types for the Tally engine.

use crate::RecordId;
use thiserror::Error;

/// All errors surfaced by the engine to its caller.
///
/// Remote failures are deliberately absent: they are logged where they
/// happen and never reach the mutation path (see [`crate::remote::RemoteError`]).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Validation errors
    #[error("missing required field: {0}")]
    MissingRequiredField(String),

    #[error("invalid value for field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    #[error("order must contain at least one item")]
    EmptyOrder,

    // Lookup errors
    #[error("record not found: {0}")]
    RecordNotFound(RecordId),

    #[error("invalid document {id}: {reason}")]
    InvalidDocument { id: RecordId, reason: String },

    // Persistence errors
    #[error("local storage error: {0}")]
    Storage(String),

    // Gate errors
    #[error("passcode must be exactly four digits")]
    MalformedPasscode,
}

impl Error {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error is a user-correctable validation failure.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::MissingRequiredField(_) | Error::InvalidField { .. } | Error::EmptyOrder
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
