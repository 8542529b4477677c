//! Protocol parameters — every value the governance process itself can tune.
//!
//! Thresholds are expressed in basis points (1/10000): a quorum of 2000 is
//! 20% of the total voting supply, a majority of 5000 is 50% of cast votes.

use serde::{Deserialize, Serialize};

/// Denominator for all basis-point values.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// `amount × bps / 10000`, or `None` on overflow.
pub fn apply_bps(amount: u128, bps: u32) -> Option<u128> {
    amount
        .checked_mul(bps as u128)
        .map(|v| v / BPS_DENOMINATOR as u128)
}

/// All protocol parameters held by the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolParams {
    // ── Proposals & voting ───────────────────────────────────────────────
    /// Delay between submission and the opening of the voting window.
    pub voting_delay_secs: u64,

    /// Length of the voting window in seconds.
    pub voting_period_secs: u64,

    /// Minimum participation as a fraction of total voting supply (basis points).
    pub quorum_bps: u32,

    /// Minimum share of for-votes among for+against (basis points).
    pub majority_bps: u32,

    /// Escrowed collateral a proposer must hold to submit a proposal (0 = no gate).
    pub min_proposal_stake: u64,

    // ── Timelock ─────────────────────────────────────────────────────────
    /// Delay between queueing and earliest execution for ordinary proposals.
    pub timelock_delay_secs: u64,

    /// Shorter delay applied to emergency-pause proposals.
    pub emergency_delay_secs: u64,

    // ── Escrow ───────────────────────────────────────────────────────────
    /// Lock period of a new escrow position.
    pub escrow_lock_secs: u64,

    /// Slashing risk assigned to new positions (basis points).
    pub default_slashing_risk_bps: u32,

    /// Reward accrual in parts-per-billion of escrowed amount per second.
    pub reward_rate_ppb: u64,
}

impl ProtocolParams {
    pub const DAY: u64 = 24 * 3600;

    /// Production defaults.
    pub fn standard() -> Self {
        Self {
            voting_delay_secs: 0,
            voting_period_secs: 7 * Self::DAY, // 1 week
            quorum_bps: 2000,                  // 20%
            majority_bps: 5000,                // 50%
            min_proposal_stake: 0,
            timelock_delay_secs: 2 * Self::DAY, // 2 days
            emergency_delay_secs: 30 * 60,      // 30 minutes
            escrow_lock_secs: 7 * Self::DAY,    // 1 week
            default_slashing_risk_bps: 1000,    // 10%
            reward_rate_ppb: 3,                 // ~9.5% per year
        }
    }

    /// Compressed timelines for local development networks.
    pub fn fast() -> Self {
        Self {
            voting_period_secs: 300,
            timelock_delay_secs: 120,
            emergency_delay_secs: 30,
            escrow_lock_secs: 600,
            ..Self::standard()
        }
    }

    /// Check internal consistency. Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.voting_period_secs == 0 {
            return Err("voting_period_secs must be greater than zero".into());
        }
        for (name, bps) in [
            ("quorum_bps", self.quorum_bps),
            ("majority_bps", self.majority_bps),
            ("default_slashing_risk_bps", self.default_slashing_risk_bps),
        ] {
            if bps > BPS_DENOMINATOR {
                return Err(format!("{name} must not exceed {BPS_DENOMINATOR}"));
            }
        }
        if self.emergency_delay_secs > self.timelock_delay_secs {
            return Err("emergency_delay_secs must not exceed timelock_delay_secs".into());
        }
        Ok(())
    }
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self::standard()
    }
}
