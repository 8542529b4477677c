//! Protocol settings — the system executed proposals act upon.

use agora_governance::{GovernanceError, GovernedSystem, ProposalAction};
use agora_types::{AccountId, ProposalId, ProtocolParams};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A lending vault registered by governance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    pub id: u64,
    pub name: String,
    pub asset: String,
    pub interest_rate_bps: u32,
    pub active: bool,
    /// Proposal that created the vault; `None` for genesis vaults.
    pub created_by: Option<ProposalId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolSettings {
    pub params: ProtocolParams,
    pub platform_fee_bps: u32,
    pub vaults: BTreeMap<u64, VaultConfig>,
    pub next_vault_id: u64,
    pub operators: BTreeSet<AccountId>,
    /// Set by an executed emergency pause.
    pub paused: bool,
}

impl ProtocolSettings {
    pub fn new(params: ProtocolParams) -> Self {
        Self {
            params,
            platform_fee_bps: 0,
            vaults: BTreeMap::new(),
            next_vault_id: 1,
            operators: BTreeSet::new(),
            paused: false,
        }
    }

    pub fn vault(&self, id: u64) -> Option<&VaultConfig> {
        self.vaults.get(&id)
    }

    pub fn is_operator(&self, account: &AccountId) -> bool {
        self.operators.contains(account)
    }

    fn active_vault_mut(&mut self, id: u64) -> Result<&mut VaultConfig, GovernanceError> {
        let vault = self
            .vaults
            .get_mut(&id)
            .ok_or(GovernanceError::VaultNotFound(id))?;
        if !vault.active {
            return Err(GovernanceError::Dispatch(format!("vault {id} is inactive")));
        }
        Ok(vault)
    }
}

impl Default for ProtocolSettings {
    fn default() -> Self {
        Self::new(ProtocolParams::standard())
    }
}

impl GovernedSystem for ProtocolSettings {
    fn dispatch(&mut self, proposal: ProposalId, action: &ProposalAction) -> Result<(), GovernanceError> {
        match action {
            ProposalAction::InterestRateUpdate { vault_id, rate_bps } => {
                self.active_vault_mut(*vault_id)?.interest_rate_bps = *rate_bps;
            }
            ProposalAction::PlatformFeeUpdate { fee_bps } => {
                self.platform_fee_bps = *fee_bps;
            }
            ProposalAction::VaultCreation { name, asset } => {
                let id = self.next_vault_id;
                self.next_vault_id = id.checked_add(1).ok_or(GovernanceError::Overflow)?;
                self.vaults.insert(
                    id,
                    VaultConfig {
                        id,
                        name: name.clone(),
                        asset: asset.clone(),
                        interest_rate_bps: 0,
                        active: true,
                        created_by: Some(proposal),
                    },
                );
                tracing::debug!(vault_id = id, name = %name, "vault created");
            }
            ProposalAction::VaultDeactivation { vault_id } => {
                self.active_vault_mut(*vault_id)?.active = false;
            }
            ProposalAction::OperatorManagement { operator, grant } => {
                if *grant {
                    self.operators.insert(operator.clone());
                } else {
                    self.operators.remove(operator);
                }
            }
            ProposalAction::EmergencyPause { paused } => {
                self.paused = *paused;
            }
            ProposalAction::ParameterUpdate { param, value } => {
                param.apply(&mut self.params, *value)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_governance::GovernableParam;

    fn pid(n: u64) -> ProposalId {
        ProposalId::new(n)
    }

    #[test]
    fn vault_lifecycle() {
        let mut settings = ProtocolSettings::default();
        settings
            .dispatch(
                pid(1),
                &ProposalAction::VaultCreation {
                    name: "Main".into(),
                    asset: "USDC".into(),
                },
            )
            .unwrap();
        assert_eq!(settings.vault(1).unwrap().created_by, Some(pid(1)));

        settings
            .dispatch(pid(2), &ProposalAction::InterestRateUpdate { vault_id: 1, rate_bps: 450 })
            .unwrap();
        assert_eq!(settings.vault(1).unwrap().interest_rate_bps, 450);

        settings
            .dispatch(pid(3), &ProposalAction::VaultDeactivation { vault_id: 1 })
            .unwrap();
        assert!(!settings.vault(1).unwrap().active);
        assert!(matches!(
            settings.dispatch(pid(4), &ProposalAction::VaultDeactivation { vault_id: 1 }),
            Err(GovernanceError::Dispatch(_))
        ));
        assert!(matches!(
            settings.dispatch(pid(5), &ProposalAction::InterestRateUpdate { vault_id: 1, rate_bps: 1 }),
            Err(GovernanceError::Dispatch(_))
        ));
    }

    #[test]
    fn unknown_vault_is_not_found() {
        let mut settings = ProtocolSettings::default();
        assert_eq!(
            settings.dispatch(pid(1), &ProposalAction::VaultDeactivation { vault_id: 9 }),
            Err(GovernanceError::VaultNotFound(9))
        );
    }

    #[test]
    fn operators_fee_and_pause() {
        let mut settings = ProtocolSettings::default();
        let op = AccountId::new("ops");
        settings
            .dispatch(pid(1), &ProposalAction::OperatorManagement { operator: op.clone(), grant: true })
            .unwrap();
        assert!(settings.is_operator(&op));
        settings
            .dispatch(pid(2), &ProposalAction::OperatorManagement { operator: op.clone(), grant: false })
            .unwrap();
        assert!(!settings.is_operator(&op));

        settings
            .dispatch(pid(3), &ProposalAction::PlatformFeeUpdate { fee_bps: 25 })
            .unwrap();
        assert_eq!(settings.platform_fee_bps, 25);

        settings
            .dispatch(pid(4), &ProposalAction::EmergencyPause { paused: true })
            .unwrap();
        assert!(settings.paused);
    }

    #[test]
    fn parameter_update_applies_and_validates() {
        let mut settings = ProtocolSettings::default();
        settings
            .dispatch(
                pid(1),
                &ProposalAction::ParameterUpdate {
                    param: GovernableParam::QuorumBps,
                    value: 3000,
                },
            )
            .unwrap();
        assert_eq!(settings.params.quorum_bps, 3000);

        let before = settings.params.clone();
        assert!(settings
            .dispatch(
                pid(2),
                &ProposalAction::ParameterUpdate {
                    param: GovernableParam::QuorumBps,
                    value: 20_000,
                },
            )
            .is_err());
        assert_eq!(settings.params, before);
    }
}
