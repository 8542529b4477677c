//! The escrow vault — owns positions and reward accounts.

use crate::error::EscrowError;
use crate::position::EscrowPosition;
use crate::rewards::{RateHistory, RewardAccount};
use agora_types::{apply_bps, AccountId, Timestamp, BPS_DENOMINATOR};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lock terms applied to new positions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LockTerms {
    pub lock_secs: u64,
    pub slashing_risk_bps: u32,
}

/// Result of a slash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashOutcome {
    /// Collateral burned by this slash.
    pub burned: u128,
    /// Amount left in the position.
    pub remaining: u128,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EscrowVault {
    positions: BTreeMap<AccountId, Vec<EscrowPosition>>,
    rewards: BTreeMap<AccountId, RewardAccount>,
    rates: RateHistory,
}

impl EscrowVault {
    pub fn new(reward_rate_ppb: u64, genesis: Timestamp) -> Self {
        Self {
            positions: BTreeMap::new(),
            rewards: BTreeMap::new(),
            rates: RateHistory::new(reward_rate_ppb, genesis),
        }
    }

    /// Bring `owner`'s reward account up to `now`. Must run before any change
    /// to the owner's positions.
    fn checkpoint(&mut self, owner: &AccountId, now: Timestamp) -> Result<(), EscrowError> {
        let positions = self.positions.get(owner).map(Vec::as_slice).unwrap_or(&[]);
        let account = self
            .rewards
            .entry(owner.clone())
            .or_insert_with(|| RewardAccount::new(now));
        account.checkpoint(positions, &self.rates, now)?;
        Ok(())
    }

    fn position_mut(&mut self, owner: &AccountId, index: usize) -> Result<&mut EscrowPosition, EscrowError> {
        self.positions
            .get_mut(owner)
            .and_then(|list| list.get_mut(index))
            .ok_or_else(|| EscrowError::PositionNotFound {
                owner: owner.clone(),
                index,
            })
    }

    /// Lock `amount` for `owner`. `available` is the owner's undelegated
    /// liquid balance; the caller debits it on success. Returns the new
    /// position's index.
    pub fn escrow(
        &mut self,
        owner: &AccountId,
        amount: u128,
        available: u128,
        terms: LockTerms,
        now: Timestamp,
    ) -> Result<usize, EscrowError> {
        if amount == 0 {
            return Err(EscrowError::ZeroAmount);
        }
        if amount > available {
            return Err(EscrowError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        self.checkpoint(owner, now)?;
        let list = self.positions.entry(owner.clone()).or_default();
        list.push(EscrowPosition::new(amount, now, terms.lock_secs, terms.slashing_risk_bps));
        let index = list.len() - 1;
        tracing::info!(owner = %owner, index, amount = %amount, "collateral escrowed");
        Ok(index)
    }

    /// Release a position whose lock has expired. Returns the amount paid
    /// out, net of any slashing.
    pub fn release(&mut self, owner: &AccountId, index: usize, now: Timestamp) -> Result<u128, EscrowError> {
        let position = self
            .positions
            .get(owner)
            .and_then(|list| list.get(index))
            .ok_or_else(|| EscrowError::PositionNotFound {
                owner: owner.clone(),
                index,
            })?;
        if position.released {
            return Err(EscrowError::AlreadyReleased(index));
        }
        if position.is_locked(now) {
            return Err(EscrowError::StillLocked {
                index,
                release_time: position.release_time,
                now,
            });
        }

        self.checkpoint(owner, now)?;
        let position = self.position_mut(owner, index)?;
        position.released = true;
        let paid = position.amount;
        tracing::info!(owner = %owner, index, amount = %paid, "escrow released");
        Ok(paid)
    }

    /// Burn `pct_bps` of what remains in a position. Admin only, before release.
    pub fn slash(
        &mut self,
        caller: &AccountId,
        admin: Option<&AccountId>,
        owner: &AccountId,
        index: usize,
        pct_bps: u32,
        now: Timestamp,
    ) -> Result<SlashOutcome, EscrowError> {
        if admin != Some(caller) {
            return Err(EscrowError::NotAdmin(caller.clone()));
        }
        if pct_bps == 0 || pct_bps > BPS_DENOMINATOR {
            return Err(EscrowError::InvalidSlashBps(pct_bps));
        }
        let position = self.position_mut(owner, index)?;
        if position.released {
            return Err(EscrowError::AlreadyReleased(index));
        }
        let burned = apply_bps(position.amount, pct_bps).ok_or(EscrowError::Overflow)?;

        self.checkpoint(owner, now)?;
        let position = self.position_mut(owner, index)?;
        position.amount -= burned;
        position.slashed = true;
        let remaining = position.amount;
        tracing::info!(
            owner = %owner,
            index,
            pct_bps,
            burned = %burned,
            remaining = %remaining,
            "escrow position slashed"
        );
        Ok(SlashOutcome { burned, remaining })
    }

    /// Pay out all pending rewards.
    pub fn claim_rewards(&mut self, owner: &AccountId, now: Timestamp) -> Result<u128, EscrowError> {
        if self.pending_rewards(owner, now)? == 0 {
            return Err(EscrowError::NothingToClaim(owner.clone()));
        }
        self.checkpoint(owner, now)?;
        let account = self
            .rewards
            .get_mut(owner)
            .ok_or_else(|| EscrowError::NothingToClaim(owner.clone()))?;
        let paid = account.pending_rewards;
        account.total_claimed = account
            .total_claimed
            .checked_add(paid)
            .ok_or(EscrowError::Overflow)?;
        account.pending_rewards = 0;
        account.last_claim_time = Some(now);
        tracing::info!(owner = %owner, amount = %paid, "rewards claimed");
        Ok(paid)
    }

    /// Close the current reward-rate segment and open one at `rate_ppb`.
    pub fn set_reward_rate(&mut self, rate_ppb: u64, now: Timestamp) -> Result<(), EscrowError> {
        self.rates.apply_rate_change(rate_ppb, now)?;
        tracing::info!(rate_ppb, "reward rate changed");
        Ok(())
    }

    // ── Reads ───────────────────────────────────────────────────────────

    /// Pending rewards as of `now`, including what has not been checkpointed.
    pub fn pending_rewards(&self, owner: &AccountId, now: Timestamp) -> Result<u128, EscrowError> {
        let positions = self.positions(owner);
        match self.rewards.get(owner) {
            Some(account) => {
                let mut account = account.clone();
                account.checkpoint(positions, &self.rates, now)?;
                Ok(account.pending_rewards)
            }
            None => Ok(0),
        }
    }

    /// Reward account with accrual brought up to `now`, without mutating.
    pub fn reward_account(&self, owner: &AccountId, now: Timestamp) -> Result<RewardAccount, EscrowError> {
        let mut account = self
            .rewards
            .get(owner)
            .cloned()
            .unwrap_or_else(|| RewardAccount::new(now));
        account.checkpoint(self.positions(owner), &self.rates, now)?;
        Ok(account)
    }

    pub fn positions(&self, owner: &AccountId) -> &[EscrowPosition] {
        self.positions.get(owner).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn position(&self, owner: &AccountId, index: usize) -> Option<&EscrowPosition> {
        self.positions(owner).get(index)
    }

    /// Collateral `owner` still has locked (unreleased positions).
    pub fn active_stake(&self, owner: &AccountId) -> u128 {
        self.positions(owner)
            .iter()
            .filter(|p| !p.released)
            .fold(0u128, |acc, p| acc.saturating_add(p.amount))
    }

    /// Collateral held across all owners.
    pub fn total_locked(&self) -> u128 {
        self.positions
            .keys()
            .fold(0u128, |acc, owner| acc.saturating_add(self.active_stake(owner)))
    }

    pub fn rates(&self) -> &RateHistory {
        &self.rates
    }

    pub fn all_positions(&self) -> impl Iterator<Item = (&AccountId, &Vec<EscrowPosition>)> {
        self.positions.iter()
    }

    pub fn all_rewards(&self) -> impl Iterator<Item = (&AccountId, &RewardAccount)> {
        self.rewards.iter()
    }

    /// Rebuild from persisted tables.
    pub fn restore(
        positions: impl IntoIterator<Item = (AccountId, Vec<EscrowPosition>)>,
        rewards: impl IntoIterator<Item = (AccountId, RewardAccount)>,
        rates: RateHistory,
    ) -> Self {
        Self {
            positions: positions.into_iter().collect(),
            rewards: rewards.into_iter().collect(),
            rates,
        }
    }
}
