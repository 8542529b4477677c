//! Escrow-specific errors.

use agora_types::{AccountId, ErrorKind, Timestamp};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EscrowError {
    #[error("amount must be non-zero")]
    ZeroAmount,

    #[error("slash percentage must be 1..=10000 bps, got {0}")]
    InvalidSlashBps(u32),

    #[error("arithmetic overflow in escrow computation")]
    Overflow,

    #[error("{0} is not the escrow admin")]
    NotAdmin(AccountId),

    #[error("position {index} is locked until {release_time} (now {now})")]
    StillLocked {
        index: usize,
        release_time: Timestamp,
        now: Timestamp,
    },

    #[error("position {0} has already been released")]
    AlreadyReleased(usize),

    #[error("{0} has no rewards to claim")]
    NothingToClaim(AccountId),

    #[error("rate change at {at} precedes the current segment start {start}")]
    InvalidTimestamp { at: Timestamp, start: Timestamp },

    #[error("insufficient undelegated balance: need {needed}, available {available}")]
    InsufficientBalance { needed: u128, available: u128 },

    #[error("{owner} has no escrow position {index}")]
    PositionNotFound { owner: AccountId, index: usize },
}

impl EscrowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ZeroAmount | Self::InvalidSlashBps(_) | Self::Overflow => ErrorKind::Validation,
            Self::NotAdmin(_) => ErrorKind::Authorization,
            Self::StillLocked { .. }
            | Self::AlreadyReleased(_)
            | Self::NothingToClaim(_)
            | Self::InvalidTimestamp { .. } => ErrorKind::State,
            Self::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            Self::PositionNotFound { .. } => ErrorKind::NotFound,
        }
    }
}
