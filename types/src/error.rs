//! Parse and construction errors for the fundamental types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("account id must not be empty")]
    EmptyAccount,

    #[error("account id is longer than {max} characters")]
    AccountTooLong { max: usize },

    #[error("account id contains invalid character {0:?}")]
    InvalidAccountChar(char),

    #[error("invalid proposal id: {0}")]
    InvalidProposalId(String),
}

/// Category of a rejected ledger transition.
///
/// Every domain error maps onto exactly one category. None of them is
/// transient: resubmitting the same command against the same state fails the
/// same way.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input: lengths, unknown enum codes, zero amounts.
    Validation,
    /// The caller is not allowed to perform the operation.
    Authorization,
    /// The operation is not valid in the current lifecycle state or time window.
    State,
    /// An amount or vote budget exceeds what the account holds.
    InsufficientBalance,
    /// Unknown proposal, position, delegate or queue entry.
    NotFound,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Authorization => "authorization",
            Self::State => "state",
            Self::InsufficientBalance => "insufficient_balance",
            Self::NotFound => "not_found",
        }
    }
}
