//! Genesis: the initial balances, admin and protocol parameters of a ledger.

use crate::balances::BalanceTable;
use crate::error::LedgerError;
use crate::settings::ProtocolSettings;
use crate::state::LedgerState;
use agora_escrow::EscrowVault;
use agora_governance::GovernanceEngine;
use agora_types::{AccountId, ProtocolParams, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// An initial token balance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub account: AccountId,
    pub amount: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisConfig {
    /// May cancel queued proposals and slash escrow positions.
    pub admin: Option<AccountId>,
    pub allocations: Vec<Allocation>,
    pub params: ProtocolParams,
}

impl GenesisConfig {
    pub fn validate(&self) -> Result<(), LedgerError> {
        self.params.validate().map_err(LedgerError::InvalidGenesis)?;
        if let Some(admin) = &self.admin {
            AccountId::parse(admin.as_str())
                .map_err(|e| LedgerError::InvalidGenesis(format!("admin: {e}")))?;
        }
        let mut seen = BTreeSet::new();
        for allocation in &self.allocations {
            AccountId::parse(allocation.account.as_str())
                .map_err(|e| LedgerError::InvalidGenesis(format!("allocation: {e}")))?;
            if allocation.amount == 0 {
                return Err(LedgerError::InvalidGenesis(format!(
                    "allocation to {} is zero",
                    allocation.account
                )));
            }
            if !seen.insert(&allocation.account) {
                return Err(LedgerError::InvalidGenesis(format!(
                    "duplicate allocation to {}",
                    allocation.account
                )));
            }
        }
        Ok(())
    }

    /// Build the initial ledger state at `genesis_time`.
    pub fn build(&self, genesis_time: Timestamp) -> Result<LedgerState, LedgerError> {
        self.validate()?;
        let mut balances = BalanceTable::new();
        for allocation in &self.allocations {
            balances.credit(&allocation.account, allocation.amount as u128)?;
        }
        Ok(LedgerState::from_parts(
            balances,
            GovernanceEngine::new(self.admin.clone()),
            EscrowVault::new(self.params.reward_rate_ppb, genesis_time),
            ProtocolSettings::new(self.params.clone()),
            0,
        ))
    }
}
