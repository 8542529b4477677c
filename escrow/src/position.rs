//! Locked collateral positions.

use agora_types::Timestamp;
use serde::{Deserialize, Serialize};

/// One escrow deposit. Released and slashed-to-zero are the terminal states;
/// a partially slashed position can still be released for what remains.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowPosition {
    /// Amount currently releasable. Only ever decreases (by slashing).
    pub amount: u128,
    /// Amount originally deposited.
    pub original_amount: u128,
    pub locked_at: Timestamp,
    pub release_time: Timestamp,
    pub released: bool,
    /// Whether any slash has been applied.
    pub slashed: bool,
    /// Policy-assigned risk of this position (basis points).
    pub slashing_risk_bps: u32,
}

impl EscrowPosition {
    pub fn new(amount: u128, now: Timestamp, lock_secs: u64, slashing_risk_bps: u32) -> Self {
        Self {
            amount,
            original_amount: amount,
            locked_at: now,
            release_time: now.plus(lock_secs),
            released: false,
            slashed: false,
            slashing_risk_bps,
        }
    }

    pub fn is_locked(&self, now: Timestamp) -> bool {
        now < self.release_time
    }

    /// Collateral removed by slashing so far.
    pub fn slashed_amount(&self) -> u128 {
        self.original_amount.saturating_sub(self.amount)
    }

    /// Whether the position still earns rewards.
    pub fn earns_rewards(&self) -> bool {
        !self.released && !self.slashed && self.amount > 0
    }

    /// Interval `[from, to)` of this position's reward accrual after `since`,
    /// capped at the release time.
    pub fn accrual_window(&self, since: Timestamp, now: Timestamp) -> Option<(Timestamp, Timestamp)> {
        let from = since.max(self.locked_at);
        let to = now.min(self.release_time);
        (from < to).then_some((from, to))
    }
}
