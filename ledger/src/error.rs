use agora_escrow::EscrowError;
use agora_governance::GovernanceError;
use agora_store::StoreError;
use agora_types::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Governance(#[from] GovernanceError),

    #[error(transparent)]
    Escrow(#[from] EscrowError),

    #[error("insufficient balance: need {needed}, available {available}")]
    InsufficientBalance { needed: u128, available: u128 },

    #[error("balance overflow")]
    Overflow,

    #[error("escrow deposits are paused")]
    Paused,

    #[error("invalid genesis: {0}")]
    InvalidGenesis(String),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Governance(e) => e.kind(),
            Self::Escrow(e) => e.kind(),
            Self::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            Self::Overflow | Self::InvalidGenesis(_) => ErrorKind::Validation,
            Self::Paused | Self::Storage(_) => ErrorKind::State,
        }
    }

    /// Ledger rejections are deterministic: the same command against the same
    /// state fails the same way.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
