use agora_types::{AccountId, ErrorKind, ProposalId, Timestamp};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GovernanceError {
    // ── Validation ──────────────────────────────────────────────────────
    #[error("title must not be empty")]
    EmptyTitle,

    #[error("title is {len} characters, maximum is {max}")]
    TitleTooLong { len: usize, max: usize },

    #[error("description must not be empty")]
    EmptyDescription,

    #[error("description is {len} characters, maximum is {max}")]
    DescriptionTooLong { len: usize, max: usize },

    #[error("unknown proposal kind code {0}")]
    UnknownProposalKind(u8),

    #[error("invalid payload for {kind}: {reason}")]
    InvalidPayload { kind: &'static str, reason: String },

    #[error("invalid option list: {0}")]
    InvalidOptions(String),

    #[error("invalid vote selection: {0}")]
    InvalidSelection(String),

    #[error("invalid delegate profile: {0}")]
    InvalidProfile(String),

    #[error("amount must be non-zero")]
    ZeroAmount,

    #[error("cannot delegate to self")]
    SelfDelegation,

    #[error("arithmetic overflow")]
    Overflow,

    // ── Authorization ───────────────────────────────────────────────────
    #[error("only the proposer or the admin can cancel proposal {0}")]
    NotProposer(ProposalId),

    #[error("{0} is not the governance admin")]
    NotAdmin(AccountId),

    // ── State ───────────────────────────────────────────────────────────
    #[error("proposal {0} is not open for voting")]
    VotingClosed(ProposalId),

    #[error("{voter} has already voted on proposal {proposal}")]
    AlreadyVoted { proposal: ProposalId, voter: AccountId },

    #[error("proposal {0} is not active")]
    NotActive(ProposalId),

    #[error("proposal {0} has already been executed or cancelled")]
    AlreadyFinalized(ProposalId),

    #[error("voting on proposal {0} has not ended")]
    VotingNotEnded(ProposalId),

    #[error("proposal {0} did not succeed")]
    NotSucceeded(ProposalId),

    #[error("proposal {0} is already queued")]
    AlreadyQueued(ProposalId),

    #[error("proposal {id} is timelocked until {eta} (now {now})")]
    TimelockNotExpired { id: ProposalId, eta: Timestamp, now: Timestamp },

    #[error("queued proposal {0} has already been executed")]
    AlreadyExecuted(ProposalId),

    #[error("queued proposal {0} was cancelled")]
    QueueCancelled(ProposalId),

    #[error("{0} has no active delegation")]
    NoActiveDelegation(AccountId),

    #[error("{account} has a vote on open proposal {proposal}; delegation is locked until it closes")]
    DelegationLocked { account: AccountId, proposal: ProposalId },

    // ── Insufficient balance ────────────────────────────────────────────
    #[error("insufficient balance: need {needed}, available {available}")]
    InsufficientBalance { needed: u128, available: u128 },

    #[error("vote costs {cost} but voting power is {power}")]
    VoteBudgetExceeded { cost: u128, power: u128 },

    #[error("{0} has no voting power")]
    NoVotingPower(AccountId),

    #[error("proposer stake {available} is below the required {needed}")]
    InsufficientStake { needed: u128, available: u128 },

    // ── Not found ───────────────────────────────────────────────────────
    #[error("proposal {0} not found")]
    ProposalNotFound(ProposalId),

    #[error("proposal {0} is not queued")]
    NotQueued(ProposalId),

    #[error("vault {0} not found")]
    VaultNotFound(u64),

    // ── Execution ───────────────────────────────────────────────────────
    #[error("proposal action rejected by the governed system: {0}")]
    Dispatch(String),
}

impl GovernanceError {
    /// The error category, see [`ErrorKind`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyTitle
            | Self::TitleTooLong { .. }
            | Self::EmptyDescription
            | Self::DescriptionTooLong { .. }
            | Self::UnknownProposalKind(_)
            | Self::InvalidPayload { .. }
            | Self::InvalidOptions(_)
            | Self::InvalidSelection(_)
            | Self::InvalidProfile(_)
            | Self::ZeroAmount
            | Self::SelfDelegation
            | Self::Overflow => ErrorKind::Validation,

            Self::NotProposer(_) | Self::NotAdmin(_) => ErrorKind::Authorization,

            Self::VotingClosed(_)
            | Self::AlreadyVoted { .. }
            | Self::NotActive(_)
            | Self::AlreadyFinalized(_)
            | Self::VotingNotEnded(_)
            | Self::NotSucceeded(_)
            | Self::AlreadyQueued(_)
            | Self::TimelockNotExpired { .. }
            | Self::AlreadyExecuted(_)
            | Self::QueueCancelled(_)
            | Self::DelegationLocked { .. }
            | Self::NoActiveDelegation(_)
            | Self::Dispatch(_) => ErrorKind::State,

            Self::InsufficientBalance { .. }
            | Self::VoteBudgetExceeded { .. }
            | Self::NoVotingPower(_)
            | Self::InsufficientStake { .. } => ErrorKind::InsufficientBalance,

            Self::ProposalNotFound(_) | Self::NotQueued(_) | Self::VaultNotFound(_) => {
                ErrorKind::NotFound
            }
        }
    }
}
