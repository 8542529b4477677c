//! On-ledger governance for the Agora protocol.
//!
//! Proposal lifecycle: Pending → Active → {Succeeded | Defeated}, and for
//! succeeded proposals Queued → {Executed | Cancelled} through the timelock.
//!
//! Votes are weighted by effective voting power (own balance, minus power
//! delegated away, plus power delegated in) and may be cast in standard,
//! quadratic, weighted or ranked mode.

pub mod action;
pub mod delegation;
pub mod engine;
pub mod error;
pub mod params;
pub mod proposal;
pub mod timelock;
pub mod voting;

pub use action::{ProposalAction, ProposalKind, MAX_PAYLOAD_BYTES};
pub use delegation::{DelegateProfile, Delegation, DelegationRegistry};
pub use engine::{Balances, GovernanceEngine, GovernedSystem};
pub use error::GovernanceError;
pub use params::GovernableParam;
pub use proposal::{
    Outcome, Proposal, ProposalDraft, ProposalRegistry, ProposalState, Tally, Thresholds,
    AGAINST_OPTION, FOR_OPTION, MAX_DESCRIPTION_LEN, MAX_OPTIONS, MAX_TITLE_LEN,
};
pub use timelock::{TimelockEntry, TimelockQueue};
pub use voting::{TallyDelta, Vote, VoteMode, VoteSelection, VotingEngine};
