//! Participation rewards and the global reward-rate history.
//!
//! Rewards accrue at `amount × seconds × rate_ppb / 1e9`. Rate changes are
//! stored once in a [`RateHistory`], so a governance rate change is a single
//! append and never touches individual accounts.

use crate::error::EscrowError;
use crate::position::EscrowPosition;
use agora_types::Timestamp;
use serde::{Deserialize, Serialize};

/// Rates are expressed in parts per billion per second.
pub const RATE_SCALE: u128 = 1_000_000_000;

/// A span of time during which one reward rate applied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateSegment {
    pub rate_ppb: u64,
    pub start: Timestamp,
    /// `None` while this is the current rate.
    pub end: Option<Timestamp>,
}

/// History of reward rates, oldest first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateHistory {
    pub segments: Vec<RateSegment>,
}

impl RateHistory {
    pub fn new(rate_ppb: u64, genesis: Timestamp) -> Self {
        Self {
            segments: vec![RateSegment {
                rate_ppb,
                start: genesis,
                end: None,
            }],
        }
    }

    /// Close the current segment at `at` and start a new one.
    pub fn apply_rate_change(&mut self, rate_ppb: u64, at: Timestamp) -> Result<(), EscrowError> {
        if let Some(current) = self.segments.last_mut() {
            if at < current.start {
                return Err(EscrowError::InvalidTimestamp {
                    at,
                    start: current.start,
                });
            }
            current.end = Some(at);
        }
        self.segments.push(RateSegment {
            rate_ppb,
            start: at,
            end: None,
        });
        Ok(())
    }

    pub fn current_rate(&self) -> u64 {
        self.segments.last().map(|s| s.rate_ppb).unwrap_or(0)
    }

    /// `Σ amount × rate × overlap` over `[from, to)`, still scaled by 1e9.
    fn scaled_accrual(&self, amount: u128, from: Timestamp, to: Timestamp) -> Option<u128> {
        let mut total: u128 = 0;
        for seg in &self.segments {
            let start = seg.start.max(from);
            let end = seg.end.unwrap_or(to).min(to);
            if start >= end {
                continue;
            }
            let secs = (end.as_secs() - start.as_secs()) as u128;
            let part = amount.checked_mul(secs)?.checked_mul(seg.rate_ppb as u128)?;
            total = total.checked_add(part)?;
        }
        Some(total)
    }

    /// Rewards earned by `positions` between `since` and `now`, still scaled
    /// by [`RATE_SCALE`].
    pub fn accrued_scaled(
        &self,
        positions: &[EscrowPosition],
        since: Timestamp,
        now: Timestamp,
    ) -> Result<u128, EscrowError> {
        let mut scaled: u128 = 0;
        for position in positions.iter().filter(|p| p.earns_rewards()) {
            if let Some((from, to)) = position.accrual_window(since, now) {
                let part = self
                    .scaled_accrual(position.amount, from, to)
                    .ok_or(EscrowError::Overflow)?;
                scaled = scaled.checked_add(part).ok_or(EscrowError::Overflow)?;
            }
        }
        Ok(scaled)
    }

    /// Whole rewards earned by `positions` between `since` and `now`.
    pub fn accrued(
        &self,
        positions: &[EscrowPosition],
        since: Timestamp,
        now: Timestamp,
    ) -> Result<u128, EscrowError> {
        Ok(self.accrued_scaled(positions, since, now)? / RATE_SCALE)
    }
}

impl Default for RateHistory {
    fn default() -> Self {
        Self::new(0, Timestamp::EPOCH)
    }
}

/// Per-owner reward bookkeeping.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardAccount {
    pub total_earned: u128,
    pub total_claimed: u128,
    pub pending_rewards: u128,
    pub last_claim_time: Option<Timestamp>,
    /// Rewards are accounted up to this instant.
    pub accrued_until: Timestamp,
    /// Fraction of a reward unit carried between checkpoints, scaled by
    /// [`RATE_SCALE`]. Always below `RATE_SCALE`.
    #[serde(default)]
    pub carry_scaled: u128,
}

impl RewardAccount {
    pub fn new(now: Timestamp) -> Self {
        Self {
            accrued_until: now,
            ..Self::default()
        }
    }

    /// Account for rewards earned since the last checkpoint.
    pub fn checkpoint(
        &mut self,
        positions: &[EscrowPosition],
        rates: &RateHistory,
        now: Timestamp,
    ) -> Result<u128, EscrowError> {
        if now <= self.accrued_until {
            return Ok(0);
        }
        let scaled = rates
            .accrued_scaled(positions, self.accrued_until, now)?
            .checked_add(self.carry_scaled)
            .ok_or(EscrowError::Overflow)?;
        let earned = scaled / RATE_SCALE;
        let pending = self
            .pending_rewards
            .checked_add(earned)
            .ok_or(EscrowError::Overflow)?;
        let total = self.total_earned.checked_add(earned).ok_or(EscrowError::Overflow)?;
        self.pending_rewards = pending;
        self.total_earned = total;
        self.accrued_until = now;
        self.carry_scaled = scaled % RATE_SCALE;
        Ok(earned)
    }
}
