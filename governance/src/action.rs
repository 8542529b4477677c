//! Proposal kinds and the typed actions they carry.
//!
//! On the wire a proposal arrives as a kind code (0..=6) plus an opaque
//! payload. Each kind has its own payload layout (bincode, fixed-width
//! integers, no trailing bytes); [`ProposalAction::decode`] turns the pair
//! into a typed action that the governed system executes.

use crate::error::GovernanceError;
use crate::params::GovernableParam;
use agora_types::{AccountId, ProtocolParams, BPS_DENOMINATOR};
use bincode::Options;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound on an encoded payload.
pub const MAX_PAYLOAD_BYTES: u64 = 4096;

const MAX_VAULT_NAME_LEN: usize = 64;
const MAX_ASSET_LEN: usize = 16;

/// The seven proposal kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ProposalKind {
    InterestRateUpdate = 0,
    PlatformFeeUpdate = 1,
    VaultCreation = 2,
    VaultDeactivation = 3,
    OperatorManagement = 4,
    EmergencyPause = 5,
    ParameterUpdate = 6,
}

impl ProposalKind {
    pub fn code(&self) -> u8 {
        *self as u8
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::InterestRateUpdate => "interest rate update",
            Self::PlatformFeeUpdate => "platform fee update",
            Self::VaultCreation => "vault creation",
            Self::VaultDeactivation => "vault deactivation",
            Self::OperatorManagement => "operator management",
            Self::EmergencyPause => "emergency pause",
            Self::ParameterUpdate => "parameter update",
        }
    }

    /// Emergency proposals run through the shorter timelock delay.
    pub fn is_emergency(&self) -> bool {
        matches!(self, Self::EmergencyPause)
    }
}

impl TryFrom<u8> for ProposalKind {
    type Error = GovernanceError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Ok(match code {
            0 => Self::InterestRateUpdate,
            1 => Self::PlatformFeeUpdate,
            2 => Self::VaultCreation,
            3 => Self::VaultDeactivation,
            4 => Self::OperatorManagement,
            5 => Self::EmergencyPause,
            6 => Self::ParameterUpdate,
            other => return Err(GovernanceError::UnknownProposalKind(other)),
        })
    }
}

impl fmt::Display for ProposalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What an approved proposal does to the governed system.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalAction {
    /// Set the interest rate of a vault.
    InterestRateUpdate { vault_id: u64, rate_bps: u32 },
    /// Set the platform fee.
    PlatformFeeUpdate { fee_bps: u32 },
    /// Register a new vault.
    VaultCreation { name: String, asset: String },
    /// Deactivate an existing vault.
    VaultDeactivation { vault_id: u64 },
    /// Grant or revoke operator rights.
    OperatorManagement { operator: AccountId, grant: bool },
    /// Pause or unpause the governed system.
    EmergencyPause { paused: bool },
    /// Change a governable protocol parameter.
    ParameterUpdate { param: GovernableParam, value: u128 },
}

fn payload_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(MAX_PAYLOAD_BYTES)
        .reject_trailing_bytes()
}

fn decode_payload<T: DeserializeOwned>(
    kind: ProposalKind,
    payload: &[u8],
) -> Result<T, GovernanceError> {
    payload_options()
        .deserialize(payload)
        .map_err(|e| GovernanceError::InvalidPayload {
            kind: kind.name(),
            reason: e.to_string(),
        })
}

fn encode_payload<T: Serialize>(kind: ProposalKind, value: &T) -> Result<Vec<u8>, GovernanceError> {
    payload_options()
        .serialize(value)
        .map_err(|e| GovernanceError::InvalidPayload {
            kind: kind.name(),
            reason: e.to_string(),
        })
}

impl ProposalAction {
    /// Decode the opaque payload of a proposal of the given kind.
    pub fn decode(kind: ProposalKind, payload: &[u8]) -> Result<Self, GovernanceError> {
        Ok(match kind {
            ProposalKind::InterestRateUpdate => {
                let (vault_id, rate_bps) = decode_payload::<(u64, u32)>(kind, payload)?;
                Self::InterestRateUpdate { vault_id, rate_bps }
            }
            ProposalKind::PlatformFeeUpdate => Self::PlatformFeeUpdate {
                fee_bps: decode_payload(kind, payload)?,
            },
            ProposalKind::VaultCreation => {
                let (name, asset) = decode_payload::<(String, String)>(kind, payload)?;
                Self::VaultCreation { name, asset }
            }
            ProposalKind::VaultDeactivation => Self::VaultDeactivation {
                vault_id: decode_payload(kind, payload)?,
            },
            ProposalKind::OperatorManagement => {
                let (operator, grant) = decode_payload::<(String, bool)>(kind, payload)?;
                let operator =
                    AccountId::parse(&operator).map_err(|e| GovernanceError::InvalidPayload {
                        kind: kind.name(),
                        reason: e.to_string(),
                    })?;
                Self::OperatorManagement { operator, grant }
            }
            ProposalKind::EmergencyPause => Self::EmergencyPause {
                paused: decode_payload(kind, payload)?,
            },
            ProposalKind::ParameterUpdate => {
                let (param, value) = decode_payload::<(GovernableParam, u128)>(kind, payload)?;
                Self::ParameterUpdate { param, value }
            }
        })
    }

    /// Encode this action's payload in the layout [`decode`](Self::decode) expects.
    ///
    /// Fails if the payload would exceed [`MAX_PAYLOAD_BYTES`].
    pub fn encode(&self) -> Result<Vec<u8>, GovernanceError> {
        let kind = self.kind();
        match self {
            Self::InterestRateUpdate { vault_id, rate_bps } => {
                encode_payload(kind, &(vault_id, rate_bps))
            }
            Self::PlatformFeeUpdate { fee_bps } => encode_payload(kind, fee_bps),
            Self::VaultCreation { name, asset } => encode_payload(kind, &(name, asset)),
            Self::VaultDeactivation { vault_id } => encode_payload(kind, vault_id),
            Self::OperatorManagement { operator, grant } => {
                encode_payload(kind, &(operator.as_str(), grant))
            }
            Self::EmergencyPause { paused } => encode_payload(kind, paused),
            Self::ParameterUpdate { param, value } => encode_payload(kind, &(param, value)),
        }
    }

    pub fn kind(&self) -> ProposalKind {
        match self {
            Self::InterestRateUpdate { .. } => ProposalKind::InterestRateUpdate,
            Self::PlatformFeeUpdate { .. } => ProposalKind::PlatformFeeUpdate,
            Self::VaultCreation { .. } => ProposalKind::VaultCreation,
            Self::VaultDeactivation { .. } => ProposalKind::VaultDeactivation,
            Self::OperatorManagement { .. } => ProposalKind::OperatorManagement,
            Self::EmergencyPause { .. } => ProposalKind::EmergencyPause,
            Self::ParameterUpdate { .. } => ProposalKind::ParameterUpdate,
        }
    }

    /// Static checks on the decoded action, run at submission time.
    pub fn validate(&self, params: &ProtocolParams) -> Result<(), GovernanceError> {
        let invalid = |reason: String| GovernanceError::InvalidPayload {
            kind: self.kind().name(),
            reason,
        };
        match self {
            Self::InterestRateUpdate { rate_bps, .. } if *rate_bps > BPS_DENOMINATOR => {
                Err(invalid(format!("rate {rate_bps} bps exceeds {BPS_DENOMINATOR}")))
            }
            Self::PlatformFeeUpdate { fee_bps } if *fee_bps > BPS_DENOMINATOR => {
                Err(invalid(format!("fee {fee_bps} bps exceeds {BPS_DENOMINATOR}")))
            }
            Self::VaultCreation { name, asset } => {
                if name.trim().is_empty() || name.chars().count() > MAX_VAULT_NAME_LEN {
                    return Err(invalid(format!(
                        "vault name must be 1..={MAX_VAULT_NAME_LEN} characters"
                    )));
                }
                if asset.is_empty()
                    || asset.len() > MAX_ASSET_LEN
                    || !asset.chars().all(|c| c.is_ascii_alphanumeric())
                {
                    return Err(invalid(format!(
                        "asset symbol must be 1..={MAX_ASSET_LEN} alphanumeric characters"
                    )));
                }
                Ok(())
            }
            Self::ParameterUpdate { param, value } => {
                let mut scratch = params.clone();
                param.apply(&mut scratch, *value)
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for ProposalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InterestRateUpdate { vault_id, rate_bps } => {
                write!(f, "set vault {vault_id} interest rate to {rate_bps} bps")
            }
            Self::PlatformFeeUpdate { fee_bps } => write!(f, "set platform fee to {fee_bps} bps"),
            Self::VaultCreation { name, asset } => write!(f, "create vault {name} ({asset})"),
            Self::VaultDeactivation { vault_id } => write!(f, "deactivate vault {vault_id}"),
            Self::OperatorManagement { operator, grant: true } => {
                write!(f, "grant operator rights to {operator}")
            }
            Self::OperatorManagement { operator, grant: false } => {
                write!(f, "revoke operator rights from {operator}")
            }
            Self::EmergencyPause { paused: true } => f.write_str("pause the protocol"),
            Self::EmergencyPause { paused: false } => f.write_str("unpause the protocol"),
            Self::ParameterUpdate { param, value } => write!(f, "set {} to {value}", param.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_codes_cover_zero_through_six() {
        for code in 0u8..=6 {
            let kind = ProposalKind::try_from(code).unwrap();
            assert_eq!(kind.code(), code);
        }
        assert_eq!(
            ProposalKind::try_from(7),
            Err(GovernanceError::UnknownProposalKind(7))
        );
    }

    #[test]
    fn only_emergency_pause_is_emergency() {
        for code in 0u8..=6 {
            let kind = ProposalKind::try_from(code).unwrap();
            assert_eq!(kind.is_emergency(), kind == ProposalKind::EmergencyPause);
        }
    }

    #[test]
    fn decode_reads_encoded_actions() {
        let actions = [
            ProposalAction::InterestRateUpdate { vault_id: 3, rate_bps: 450 },
            ProposalAction::PlatformFeeUpdate { fee_bps: 25 },
            ProposalAction::VaultCreation {
                name: "Stable Yield".into(),
                asset: "USDC".into(),
            },
            ProposalAction::VaultDeactivation { vault_id: 9 },
            ProposalAction::OperatorManagement {
                operator: AccountId::new("keeper"),
                grant: true,
            },
            ProposalAction::EmergencyPause { paused: true },
            ProposalAction::ParameterUpdate {
                param: GovernableParam::QuorumBps,
                value: 2500,
            },
        ];
        for action in actions {
            let decoded = ProposalAction::decode(action.kind(), &action.encode().unwrap()).unwrap();
            assert_eq!(decoded, action);
        }
    }

    #[test]
    fn decode_rejects_payload_of_another_kind() {
        let fee = ProposalAction::PlatformFeeUpdate { fee_bps: 25 }.encode().unwrap();
        let err = ProposalAction::decode(ProposalKind::InterestRateUpdate, &fee).unwrap_err();
        assert!(matches!(err, GovernanceError::InvalidPayload { .. }));
    }

    #[test]
    fn decode_rejects_trailing_bytes() {
        let mut payload = ProposalAction::EmergencyPause { paused: true }.encode().unwrap();
        payload.push(0);
        assert!(ProposalAction::decode(ProposalKind::EmergencyPause, &payload).is_err());
    }

    #[test]
    fn encode_rejects_oversized_payload() {
        let action = ProposalAction::VaultCreation {
            name: "v".repeat(MAX_PAYLOAD_BYTES as usize),
            asset: "USDC".into(),
        };
        let err = action.encode().unwrap_err();
        assert!(matches!(
            err,
            GovernanceError::InvalidPayload { kind: "vault creation", .. }
        ));
    }

    #[test]
    fn validate_rejects_out_of_range_fee() {
        let params = ProtocolParams::standard();
        let action = ProposalAction::PlatformFeeUpdate { fee_bps: 10_001 };
        assert!(action.validate(&params).is_err());
        let action = ProposalAction::ParameterUpdate {
            param: GovernableParam::VotingPeriodSecs,
            value: 0,
        };
        assert!(action.validate(&params).is_err());
    }
}
