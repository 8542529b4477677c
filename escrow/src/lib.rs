//! Escrow — locked collateral that grants standing and earns rewards.
//!
//! A position is locked for a fixed period. Once the lock expires it can be
//! released, returning whatever was not slashed. While locked and unslashed
//! it earns participation rewards:
//!
//! `reward = Σ amount × elapsed × rate_ppb / 1e9`
//!
//! Accrual is checkpointed into the owner's [`RewardAccount`] before every
//! change to their positions.

pub mod error;
pub mod position;
pub mod rewards;
pub mod vault;

pub use error::EscrowError;
pub use position::EscrowPosition;
pub use rewards::{RateHistory, RateSegment, RewardAccount, RATE_SCALE};
pub use vault::{EscrowVault, LockTerms, SlashOutcome};
