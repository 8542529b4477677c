//! The ledger's write surface: one [`Command`] per state-changing operation,
//! wrapped in an [`Envelope`] naming the caller, answered with a [`Receipt`].

use agora_escrow::{EscrowPosition, SlashOutcome};
use agora_governance::{
    DelegateProfile, Delegation, ProposalAction, ProposalDraft, TimelockEntry, Vote, VoteSelection,
};
use agora_types::{AccountId, ProposalId, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    CreateProposal { draft: ProposalDraft },
    Vote { proposal_id: ProposalId, selection: VoteSelection },
    Queue { proposal_id: ProposalId },
    Execute { proposal_id: ProposalId },
    CancelProposal { proposal_id: ProposalId },
    /// Admin only.
    CancelQueued { proposal_id: ProposalId },
    Delegate { delegate: AccountId, amount: u128 },
    Undelegate,
    RegisterDelegate { name: String, description: String },
    Escrow { amount: u128 },
    Release { index: usize },
    /// Admin only.
    Slash { owner: AccountId, index: usize, pct_bps: u32 },
    ClaimRewards,
}

impl Command {
    /// Stable name, used for logs and metric labels.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateProposal { .. } => "create_proposal",
            Self::Vote { .. } => "vote",
            Self::Queue { .. } => "queue",
            Self::Execute { .. } => "execute",
            Self::CancelProposal { .. } => "cancel_proposal",
            Self::CancelQueued { .. } => "cancel_queued",
            Self::Delegate { .. } => "delegate",
            Self::Undelegate => "undelegate",
            Self::RegisterDelegate { .. } => "register_delegate",
            Self::Escrow { .. } => "escrow",
            Self::Release { .. } => "release",
            Self::Slash { .. } => "slash",
            Self::ClaimRewards => "claim_rewards",
        }
    }
}

/// A command together with the account submitting it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub caller: AccountId,
    pub command: Command,
}

impl Envelope {
    pub fn new(caller: AccountId, command: Command) -> Self {
        Self { caller, command }
    }
}

/// What a committed command did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    ProposalCreated { proposal_id: ProposalId },
    VoteCast { vote: Vote },
    Queued { entry: TimelockEntry },
    Executed { proposal_id: ProposalId, action: ProposalAction },
    ProposalCancelled { proposal_id: ProposalId },
    QueueCancelled { entry: TimelockEntry },
    Delegated { delegation: Delegation },
    Undelegated { delegation: Delegation },
    DelegateRegistered { profile: DelegateProfile },
    Escrowed { index: usize, position: EscrowPosition },
    Released { index: usize, amount: u128 },
    Slashed { owner: AccountId, index: usize, outcome: SlashOutcome },
    RewardsClaimed { amount: u128 },
}

/// Confirmation of a committed command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Position of this command in the ledger's history, starting at 1.
    pub sequence: u64,
    pub caller: AccountId,
    pub command: String,
    pub at: Timestamp,
    pub effect: Effect,
}
