//! Ledger state and the pure transition function.

use crate::balances::{BalanceTable, BalanceView};
use crate::command::{Command, Effect, Envelope, Receipt};
use crate::error::LedgerError;
use crate::settings::ProtocolSettings;
use agora_escrow::{EscrowPosition, EscrowVault, LockTerms, RewardAccount};
use agora_governance::{
    DelegateProfile, GovernableParam, GovernanceEngine, Proposal, ProposalAction, ProposalState,
    TimelockEntry, Vote,
};
use agora_types::{AccountId, ProposalId, Timestamp};
use serde::{Deserialize, Serialize};

/// Every table of the ledger.
#[derive(Clone, Debug, Default)]
pub struct LedgerState {
    pub(crate) balances: BalanceTable,
    pub(crate) governance: GovernanceEngine,
    pub(crate) escrow: EscrowVault,
    pub(crate) settings: ProtocolSettings,
    pub(crate) sequence: u64,
}

/// A proposal together with its derived lifecycle state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalView {
    pub proposal: Proposal,
    pub state: ProposalState,
    pub timelock: Option<TimelockEntry>,
}

/// Apply `envelope` to `state`. On success returns the next state and a
/// receipt; `state` itself is never modified.
pub fn transition(
    state: &LedgerState,
    envelope: &Envelope,
    now: Timestamp,
) -> Result<(LedgerState, Receipt), LedgerError> {
    let mut next = state.clone();
    let effect = next.execute(&envelope.caller, &envelope.command, now)?;
    next.sequence = next.sequence.checked_add(1).ok_or(LedgerError::Overflow)?;
    let receipt = Receipt {
        sequence: next.sequence,
        caller: envelope.caller.clone(),
        command: envelope.command.name().to_string(),
        at: now,
        effect,
    };
    Ok((next, receipt))
}

impl LedgerState {
    pub(crate) fn from_parts(
        balances: BalanceTable,
        governance: GovernanceEngine,
        escrow: EscrowVault,
        settings: ProtocolSettings,
        sequence: u64,
    ) -> Self {
        Self {
            balances,
            governance,
            escrow,
            settings,
            sequence,
        }
    }

    fn execute(&mut self, caller: &AccountId, command: &Command, now: Timestamp) -> Result<Effect, LedgerError> {
        let view = BalanceView::new(&self.balances, &self.escrow);
        match command {
            Command::CreateProposal { draft } => {
                let proposal_id = self
                    .governance
                    .create_proposal(caller, draft, &view, &self.settings.params, now)?;
                Ok(Effect::ProposalCreated { proposal_id })
            }
            Command::Vote {
                proposal_id,
                selection,
            } => {
                let vote = self
                    .governance
                    .vote(*proposal_id, caller, selection.clone(), &view, now)?;
                Ok(Effect::VoteCast { vote })
            }
            Command::Queue { proposal_id } => {
                let entry = self.governance.queue(*proposal_id, &self.settings.params, now)?;
                Ok(Effect::Queued { entry })
            }
            Command::Execute { proposal_id } => {
                let action = self.governance.execute(*proposal_id, &mut self.settings, now)?;
                if let ProposalAction::ParameterUpdate {
                    param: GovernableParam::RewardRatePpb,
                    ..
                } = action
                {
                    self.escrow
                        .set_reward_rate(self.settings.params.reward_rate_ppb, now)?;
                }
                Ok(Effect::Executed {
                    proposal_id: *proposal_id,
                    action,
                })
            }
            Command::CancelProposal { proposal_id } => {
                self.governance.cancel_proposal(*proposal_id, caller, now)?;
                Ok(Effect::ProposalCancelled {
                    proposal_id: *proposal_id,
                })
            }
            Command::CancelQueued { proposal_id } => {
                let entry = self.governance.cancel_queued(*proposal_id, caller)?;
                Ok(Effect::QueueCancelled { entry })
            }
            Command::Delegate { delegate, amount } => {
                self.governance
                    .delegate(caller, delegate, *amount, &view, now)?;
                let delegation = self
                    .governance
                    .delegations()
                    .delegation_of(caller)
                    .cloned()
                    .ok_or_else(|| agora_governance::GovernanceError::NoActiveDelegation(caller.clone()))?;
                Ok(Effect::Delegated { delegation })
            }
            Command::Undelegate => {
                let delegation = self.governance.undelegate(caller, now)?;
                Ok(Effect::Undelegated { delegation })
            }
            Command::RegisterDelegate { name, description } => {
                let profile = self
                    .governance
                    .register_delegate(caller, name, description, now)?;
                Ok(Effect::DelegateRegistered { profile })
            }
            Command::Escrow { amount } => {
                if self.settings.paused {
                    return Err(LedgerError::Paused);
                }
                let available = self
                    .balances
                    .balance_of(caller)
                    .saturating_sub(self.governance.delegated_away(caller));
                let terms = LockTerms {
                    lock_secs: self.settings.params.escrow_lock_secs,
                    slashing_risk_bps: self.settings.params.default_slashing_risk_bps,
                };
                let index = self.escrow.escrow(caller, *amount, available, terms, now)?;
                self.balances.debit(caller, *amount)?;
                let position = self
                    .escrow
                    .position(caller, index)
                    .cloned()
                    .ok_or_else(|| agora_escrow::EscrowError::PositionNotFound {
                        owner: caller.clone(),
                        index,
                    })?;
                Ok(Effect::Escrowed { index, position })
            }
            Command::Release { index } => {
                let amount = self.escrow.release(caller, *index, now)?;
                self.balances.credit(caller, amount)?;
                Ok(Effect::Released {
                    index: *index,
                    amount,
                })
            }
            Command::Slash {
                owner,
                index,
                pct_bps,
            } => {
                let outcome =
                    self.escrow
                        .slash(caller, self.governance.admin(), owner, *index, *pct_bps, now)?;
                Ok(Effect::Slashed {
                    owner: owner.clone(),
                    index: *index,
                    outcome,
                })
            }
            Command::ClaimRewards => {
                let amount = self.escrow.claim_rewards(caller, now)?;
                self.balances.credit(caller, amount)?;
                Ok(Effect::RewardsClaimed { amount })
            }
        }
    }

    // ── Reads ───────────────────────────────────────────────────────────

    /// Number of commands committed so far.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn balance_of(&self, account: &AccountId) -> u128 {
        self.balances.balance_of(account)
    }

    pub fn total_supply(&self) -> u128 {
        self.balances.total_supply()
    }

    /// Own balance minus power delegated away plus power delegated in.
    pub fn voting_power(&self, account: &AccountId) -> u128 {
        self.governance
            .voting_power(account, &BalanceView::new(&self.balances, &self.escrow))
    }

    pub fn proposal(&self, id: ProposalId, now: Timestamp) -> Option<ProposalView> {
        let proposal = self.governance.proposal(id)?.clone();
        let state = self.governance.state(id, now).ok()?;
        Some(ProposalView {
            proposal,
            state,
            timelock: self.governance.timelock().get(id).cloned(),
        })
    }

    pub fn proposals(&self, now: Timestamp) -> Vec<ProposalView> {
        self.governance
            .proposals()
            .iter()
            .filter_map(|p| self.proposal(p.id, now))
            .collect()
    }

    pub fn votes_for(&self, id: ProposalId) -> Vec<Vote> {
        self.governance.votes().votes_for(id).cloned().collect()
    }

    /// Registered delegates, most delegated-to first.
    pub fn delegates(&self) -> Vec<(AccountId, DelegateProfile)> {
        self.governance
            .delegations()
            .list_delegates()
            .into_iter()
            .map(|(a, p)| (a.clone(), p.clone()))
            .collect()
    }

    pub fn positions(&self, owner: &AccountId) -> &[EscrowPosition] {
        self.escrow.positions(owner)
    }

    pub fn reward_account(&self, owner: &AccountId, now: Timestamp) -> Result<RewardAccount, LedgerError> {
        Ok(self.escrow.reward_account(owner, now)?)
    }

    pub fn settings(&self) -> &ProtocolSettings {
        &self.settings
    }

    pub fn governance(&self) -> &GovernanceEngine {
        &self.governance
    }

    pub fn escrow(&self) -> &EscrowVault {
        &self.escrow
    }

    pub fn balances(&self) -> &BalanceTable {
        &self.balances
    }
}
