//! Governance proposals and their lifecycle.
//!
//! ```text
//! Pending ─▶ Active ─▶ Succeeded ─▶ Queued ─▶ Executed
//!              │           │          └─────▶ Cancelled (timelock)
//!              │           └─▶ Defeated
//!              └─▶ Cancelled (proposer / admin)
//! ```
//!
//! Records are never deleted. Tallies only grow while the proposal is active.

use crate::action::{ProposalAction, ProposalKind};
use crate::error::GovernanceError;
use agora_types::{AccountId, ProposalId, ProtocolParams, Timestamp, BPS_DENOMINATOR};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MAX_TITLE_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 1000;
/// Upper bound on options per proposal, including for/against.
pub const MAX_OPTIONS: usize = 8;
const MAX_OPTION_LABEL_LEN: usize = 32;

/// Index of the "for" option on every proposal.
pub const FOR_OPTION: u16 = 0;
/// Index of the "against" option on every proposal.
pub const AGAINST_OPTION: u16 = 1;

/// Lifecycle state of a proposal at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalState {
    /// Submitted; voting window not yet open.
    Pending,
    /// Voting window open.
    Active,
    /// Voting ended with quorum and majority met.
    Succeeded,
    /// Voting ended without quorum or majority.
    Defeated,
    /// In the timelock, waiting for its ETA.
    Queued,
    /// Action dispatched.
    Executed,
    /// Cancelled by the proposer/admin, or its timelock entry was cancelled.
    Cancelled,
}

/// Final result of a closed vote.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Succeeded,
    Defeated,
}

/// Approval thresholds captured when the proposal was created.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    pub quorum_bps: u32,
    pub majority_bps: u32,
}

/// Aggregate vote totals for one proposal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    /// Weight accumulated per option. Index 0 is "for", 1 is "against".
    pub options: Vec<u128>,
    /// Positional (Borda) scores from ranked ballots.
    pub ranked_scores: Vec<u128>,
    /// Number of ballots cast.
    pub voters: u64,
}

impl Tally {
    pub fn new(option_count: usize) -> Self {
        Self {
            options: vec![0; option_count],
            ranked_scores: vec![0; option_count],
            voters: 0,
        }
    }

    pub fn for_votes(&self) -> u128 {
        self.options.get(FOR_OPTION as usize).copied().unwrap_or(0)
    }

    pub fn against_votes(&self) -> u128 {
        self.options.get(AGAINST_OPTION as usize).copied().unwrap_or(0)
    }

    /// Total weight cast across every option.
    pub fn participation(&self) -> u128 {
        self.options
            .iter()
            .fold(0u128, |acc, w| acc.saturating_add(*w))
    }

    /// Option with the highest ranked score; ties go to the lowest index.
    /// `None` until a ranked ballot has been cast.
    pub fn ranked_winner(&self) -> Option<u16> {
        let (index, score) = self
            .ranked_scores
            .iter()
            .enumerate()
            .fold((0usize, 0u128), |best, (i, s)| if *s > best.1 { (i, *s) } else { best });
        (score > 0).then_some(index as u16)
    }
}

/// A governance proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub proposer: AccountId,
    pub title: String,
    pub description: String,
    pub kind: ProposalKind,
    pub action: ProposalAction,
    /// Option labels. Always starts with "for" and "against".
    pub options: Vec<String>,
    pub created_at: Timestamp,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    /// Total voting supply when the proposal was created, used for quorum.
    pub total_supply_snapshot: u128,
    pub thresholds: Thresholds,
    pub tally: Tally,
    pub executed: bool,
    pub cancelled: bool,
}

impl Proposal {
    pub fn for_votes(&self) -> u128 {
        self.tally.for_votes()
    }

    pub fn against_votes(&self) -> u128 {
        self.tally.against_votes()
    }

    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    /// `now ∈ [start, end) ∧ ¬executed ∧ ¬cancelled`.
    pub fn is_active(&self, now: Timestamp) -> bool {
        now >= self.start_time && now < self.end_time && !self.executed && !self.cancelled
    }

    pub fn voting_ended(&self, now: Timestamp) -> bool {
        now >= self.end_time
    }

    /// Outcome of the vote, or `None` while voting is still open.
    pub fn outcome(&self, now: Timestamp) -> Option<Outcome> {
        if !self.voting_ended(now) {
            return None;
        }
        // Only for/against ballots count towards quorum.
        let decided = self.for_votes().saturating_add(self.against_votes());
        let quorum = meets_bps(decided, self.total_supply_snapshot, self.thresholds.quorum_bps);
        let majority = meets_bps(self.for_votes(), decided, self.thresholds.majority_bps);
        if decided > 0 && quorum && majority {
            Some(Outcome::Succeeded)
        } else {
            Some(Outcome::Defeated)
        }
    }

    /// `now > end ∧ Succeeded ∧ ¬executed ∧ ¬cancelled`.
    pub fn can_queue(&self, now: Timestamp) -> bool {
        now > self.end_time
            && self.outcome(now) == Some(Outcome::Succeeded)
            && !self.executed
            && !self.cancelled
    }

    /// Lifecycle state, ignoring the timelock. The engine overlays
    /// Queued/Cancelled from the timelock entry.
    pub fn state(&self, now: Timestamp) -> ProposalState {
        if self.cancelled {
            ProposalState::Cancelled
        } else if self.executed {
            ProposalState::Executed
        } else if now < self.start_time {
            ProposalState::Pending
        } else if now < self.end_time {
            ProposalState::Active
        } else {
            match self.outcome(now) {
                Some(Outcome::Succeeded) => ProposalState::Succeeded,
                _ => ProposalState::Defeated,
            }
        }
    }
}

/// `part / whole ≥ bps / 10000`, computed without division.
fn meets_bps(part: u128, whole: u128, bps: u32) -> bool {
    if bps == 0 {
        return true;
    }
    match (
        part.checked_mul(BPS_DENOMINATOR as u128),
        whole.checked_mul(bps as u128),
    ) {
        (Some(lhs), Some(rhs)) => lhs >= rhs,
        // Amounts this large lose nothing meaningful to integer division.
        _ => part / bps as u128 >= whole / BPS_DENOMINATOR as u128,
    }
}

/// Input to [`ProposalRegistry::create`], as received from the submitter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalDraft {
    pub title: String,
    pub description: String,
    /// Wire code of the proposal kind (0..=6).
    pub kind: u8,
    /// Opaque action payload, decoded according to `kind`.
    pub payload: Vec<u8>,
    /// Labels of options beyond for/against, for multi-outcome proposals.
    #[serde(default)]
    pub extra_options: Vec<String>,
}

impl ProposalDraft {
    /// Draft for a binary proposal carrying `action`.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        action: &ProposalAction,
    ) -> Result<Self, GovernanceError> {
        Ok(Self {
            title: title.into(),
            description: description.into(),
            kind: action.kind().code(),
            payload: action.encode()?,
            extra_options: Vec::new(),
        })
    }

    pub fn with_options(mut self, extra: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extra_options = extra.into_iter().map(Into::into).collect();
        self
    }

    fn validate_text(&self) -> Result<(), GovernanceError> {
        let title_len = self.title.chars().count();
        if self.title.trim().is_empty() {
            return Err(GovernanceError::EmptyTitle);
        }
        if title_len > MAX_TITLE_LEN {
            return Err(GovernanceError::TitleTooLong {
                len: title_len,
                max: MAX_TITLE_LEN,
            });
        }
        let description_len = self.description.chars().count();
        if self.description.trim().is_empty() {
            return Err(GovernanceError::EmptyDescription);
        }
        if description_len > MAX_DESCRIPTION_LEN {
            return Err(GovernanceError::DescriptionTooLong {
                len: description_len,
                max: MAX_DESCRIPTION_LEN,
            });
        }
        Ok(())
    }

    fn option_labels(&self) -> Result<Vec<String>, GovernanceError> {
        let mut labels = vec!["for".to_string(), "against".to_string()];
        if labels.len() + self.extra_options.len() > MAX_OPTIONS {
            return Err(GovernanceError::InvalidOptions(format!(
                "at most {MAX_OPTIONS} options are allowed"
            )));
        }
        for label in &self.extra_options {
            let trimmed = label.trim();
            if trimmed.is_empty() || trimmed.chars().count() > MAX_OPTION_LABEL_LEN {
                return Err(GovernanceError::InvalidOptions(format!(
                    "option labels must be 1..={MAX_OPTION_LABEL_LEN} characters"
                )));
            }
            if labels.iter().any(|l| l.eq_ignore_ascii_case(trimmed)) {
                return Err(GovernanceError::InvalidOptions(format!(
                    "duplicate option {trimmed:?}"
                )));
            }
            labels.push(trimmed.to_string());
        }
        Ok(labels)
    }
}

/// Keyed table of proposals plus the id sequence.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProposalRegistry {
    proposals: BTreeMap<ProposalId, Proposal>,
    last_id: u64,
}

impl ProposalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a draft and append a new proposal. Nothing is written on error.
    pub fn create(
        &mut self,
        proposer: &AccountId,
        draft: &ProposalDraft,
        params: &ProtocolParams,
        total_supply: u128,
        now: Timestamp,
    ) -> Result<ProposalId, GovernanceError> {
        draft.validate_text()?;
        let kind = ProposalKind::try_from(draft.kind)?;
        let action = ProposalAction::decode(kind, &draft.payload)?;
        action.validate(params)?;
        let options = draft.option_labels()?;

        let id = ProposalId::new(self.last_id)
            .next()
            .ok_or(GovernanceError::Overflow)?;
        let start_time = now.plus(params.voting_delay_secs);
        let end_time = start_time.plus(params.voting_period_secs);
        let tally = Tally::new(options.len());

        self.proposals.insert(
            id,
            Proposal {
                id,
                proposer: proposer.clone(),
                title: draft.title.trim().to_string(),
                description: draft.description.clone(),
                kind,
                action,
                options,
                created_at: now,
                start_time,
                end_time,
                total_supply_snapshot: total_supply,
                thresholds: Thresholds {
                    quorum_bps: params.quorum_bps,
                    majority_bps: params.majority_bps,
                },
                tally,
                executed: false,
                cancelled: false,
            },
        );
        self.last_id = id.get();
        Ok(id)
    }

    /// Cancel an active proposal. Only the proposer or the admin may do this.
    pub fn cancel(
        &mut self,
        id: ProposalId,
        caller: &AccountId,
        admin: Option<&AccountId>,
        now: Timestamp,
    ) -> Result<(), GovernanceError> {
        let proposal = self
            .proposals
            .get_mut(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;
        if proposal.executed || proposal.cancelled {
            return Err(GovernanceError::AlreadyFinalized(id));
        }
        if !proposal.is_active(now) {
            return Err(GovernanceError::NotActive(id));
        }
        if &proposal.proposer != caller && admin != Some(caller) {
            return Err(GovernanceError::NotProposer(id));
        }
        proposal.cancelled = true;
        Ok(())
    }

    pub fn get(&self, id: ProposalId) -> Option<&Proposal> {
        self.proposals.get(&id)
    }

    pub fn require(&self, id: ProposalId) -> Result<&Proposal, GovernanceError> {
        self.proposals
            .get(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))
    }

    pub(crate) fn require_mut(&mut self, id: ProposalId) -> Result<&mut Proposal, GovernanceError> {
        self.proposals
            .get_mut(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))
    }

    /// All proposals in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Proposal> {
        self.proposals.values()
    }

    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }

    pub fn last_id(&self) -> u64 {
        self.last_id
    }

    /// Rebuild the registry from persisted records.
    pub fn restore(proposals: impl IntoIterator<Item = Proposal>) -> Self {
        let proposals: BTreeMap<_, _> = proposals.into_iter().map(|p| (p.id, p)).collect();
        let last_id = proposals.keys().next_back().map_or(0, |id| id.get());
        Self { proposals, last_id }
    }
}
