//! All governable protocol parameters.
//!
//! Every parameter can be changed by a generic parameter-update proposal,
//! including the governance thresholds themselves.

use crate::error::GovernanceError;
use agora_types::ProtocolParams;
use serde::{Deserialize, Serialize};

/// Enum of all protocol parameters that can be changed by governance vote.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GovernableParam {
    // Proposals & voting
    VotingDelaySecs,
    VotingPeriodSecs,
    QuorumBps,
    MajorityBps,
    MinProposalStake,

    // Timelock
    TimelockDelaySecs,
    EmergencyDelaySecs,

    // Escrow
    EscrowLockSecs,
    DefaultSlashingRiskBps,
    RewardRatePpb,
}

impl GovernableParam {
    pub const ALL: [GovernableParam; 10] = [
        Self::VotingDelaySecs,
        Self::VotingPeriodSecs,
        Self::QuorumBps,
        Self::MajorityBps,
        Self::MinProposalStake,
        Self::TimelockDelaySecs,
        Self::EmergencyDelaySecs,
        Self::EscrowLockSecs,
        Self::DefaultSlashingRiskBps,
        Self::RewardRatePpb,
    ];

    /// Human-readable name of this parameter.
    pub fn name(&self) -> &'static str {
        match self {
            Self::VotingDelaySecs => "voting_delay_secs",
            Self::VotingPeriodSecs => "voting_period_secs",
            Self::QuorumBps => "quorum_bps",
            Self::MajorityBps => "majority_bps",
            Self::MinProposalStake => "min_proposal_stake",
            Self::TimelockDelaySecs => "timelock_delay_secs",
            Self::EmergencyDelaySecs => "emergency_delay_secs",
            Self::EscrowLockSecs => "escrow_lock_secs",
            Self::DefaultSlashingRiskBps => "default_slashing_risk_bps",
            Self::RewardRatePpb => "reward_rate_ppb",
        }
    }

    /// Look a parameter up by its [`name`](Self::name).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.name() == name)
    }

    /// Current value of this parameter.
    pub fn read(&self, params: &ProtocolParams) -> u128 {
        match self {
            Self::VotingDelaySecs => params.voting_delay_secs as u128,
            Self::VotingPeriodSecs => params.voting_period_secs as u128,
            Self::QuorumBps => params.quorum_bps as u128,
            Self::MajorityBps => params.majority_bps as u128,
            Self::MinProposalStake => params.min_proposal_stake as u128,
            Self::TimelockDelaySecs => params.timelock_delay_secs as u128,
            Self::EmergencyDelaySecs => params.emergency_delay_secs as u128,
            Self::EscrowLockSecs => params.escrow_lock_secs as u128,
            Self::DefaultSlashingRiskBps => params.default_slashing_risk_bps as u128,
            Self::RewardRatePpb => params.reward_rate_ppb as u128,
        }
    }

    /// Write `value` into `params`, rejecting values that do not fit the field
    /// or leave the parameter set inconsistent. `params` is untouched on error.
    pub fn apply(&self, params: &mut ProtocolParams, value: u128) -> Result<(), GovernanceError> {
        let mut next = params.clone();
        match self {
            Self::VotingDelaySecs => next.voting_delay_secs = self.narrow(value)?,
            Self::VotingPeriodSecs => next.voting_period_secs = self.narrow(value)?,
            Self::QuorumBps => next.quorum_bps = self.narrow(value)?,
            Self::MajorityBps => next.majority_bps = self.narrow(value)?,
            Self::MinProposalStake => next.min_proposal_stake = self.narrow(value)?,
            Self::TimelockDelaySecs => next.timelock_delay_secs = self.narrow(value)?,
            Self::EmergencyDelaySecs => next.emergency_delay_secs = self.narrow(value)?,
            Self::EscrowLockSecs => next.escrow_lock_secs = self.narrow(value)?,
            Self::DefaultSlashingRiskBps => next.default_slashing_risk_bps = self.narrow(value)?,
            Self::RewardRatePpb => next.reward_rate_ppb = self.narrow(value)?,
        }
        next.validate().map_err(|reason| GovernanceError::InvalidPayload {
            kind: "parameter update",
            reason,
        })?;
        *params = next;
        Ok(())
    }

    fn narrow<T: TryFrom<u128>>(&self, value: u128) -> Result<T, GovernanceError> {
        T::try_from(value).map_err(|_| GovernanceError::InvalidPayload {
            kind: "parameter update",
            reason: format!("{value} is out of range for {}", self.name()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for param in GovernableParam::ALL {
            assert_eq!(GovernableParam::from_name(param.name()), Some(param));
        }
        assert_eq!(GovernableParam::from_name("mint_rate"), None);
    }

    #[test]
    fn apply_updates_single_field() {
        let mut params = ProtocolParams::standard();
        GovernableParam::QuorumBps.apply(&mut params, 3000).unwrap();
        assert_eq!(params.quorum_bps, 3000);
        assert_eq!(GovernableParam::QuorumBps.read(&params), 3000);
    }

    #[test]
    fn apply_rejects_inconsistent_values() {
        let mut params = ProtocolParams::standard();
        let before = params.clone();
        assert!(GovernableParam::MajorityBps.apply(&mut params, 10_001).is_err());
        assert!(GovernableParam::VotingPeriodSecs.apply(&mut params, 0).is_err());
        assert!(GovernableParam::QuorumBps
            .apply(&mut params, u32::MAX as u128 + 1)
            .is_err());
        assert_eq!(params, before);
    }
}
