//! Vote casting under four tally modes.
//!
//! A ballot is first turned into a [`TallyDelta`] (all validation happens
//! there), and only then committed to the proposal and the vote table. A
//! rejected ballot therefore leaves both untouched.

use crate::error::GovernanceError;
use crate::proposal::{Proposal, AGAINST_OPTION, FOR_OPTION};
use agora_types::{AccountId, ProposalId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Tally mode of a ballot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteMode {
    Standard,
    Quadratic,
    Weighted,
    Ranked,
}

impl VoteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Quadratic => "quadratic",
            Self::Weighted => "weighted",
            Self::Ranked => "ranked",
        }
    }
}

impl fmt::Display for VoteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a voter selected; the shape depends on the mode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteSelection {
    /// Full power for or against.
    Standard { support: bool },
    /// `weight` on one option, costing `weight²` of the power budget.
    Quadratic { option: u16, weight: u128 },
    /// Power split across options; the sum must fit the budget.
    Weighted { allocations: BTreeMap<u16, u128> },
    /// Every option, most preferred first.
    Ranked { ranking: Vec<u16> },
}

impl VoteSelection {
    pub fn mode(&self) -> VoteMode {
        match self {
            Self::Standard { .. } => VoteMode::Standard,
            Self::Quadratic { .. } => VoteMode::Quadratic,
            Self::Weighted { .. } => VoteMode::Weighted,
            Self::Ranked { .. } => VoteMode::Ranked,
        }
    }

    /// Turn the selection into tally increments for `proposal`.
    pub fn plan(&self, proposal: &Proposal, power: u128) -> Result<TallyDelta, GovernanceError> {
        let n = proposal.option_count();
        let mut delta = TallyDelta::zero(n);
        match self {
            Self::Standard { support } => {
                let option = if *support { FOR_OPTION } else { AGAINST_OPTION };
                delta.options[option as usize] = power;
                delta.weight = power;
                delta.cost = power;
            }
            Self::Quadratic { option, weight } => {
                check_option(*option, n)?;
                if *weight == 0 {
                    return Err(GovernanceError::InvalidSelection("weight must be non-zero".into()));
                }
                let cost = weight.checked_mul(*weight).ok_or(GovernanceError::Overflow)?;
                if cost > power {
                    return Err(GovernanceError::VoteBudgetExceeded { cost, power });
                }
                delta.options[*option as usize] = *weight;
                delta.weight = *weight;
                delta.cost = cost;
            }
            Self::Weighted { allocations } => {
                if allocations.is_empty() {
                    return Err(GovernanceError::InvalidSelection("no allocations".into()));
                }
                let mut total = 0u128;
                for (option, weight) in allocations {
                    check_option(*option, n)?;
                    if *weight == 0 {
                        return Err(GovernanceError::InvalidSelection(format!(
                            "zero allocation for option {option}"
                        )));
                    }
                    total = total.checked_add(*weight).ok_or(GovernanceError::Overflow)?;
                    delta.options[*option as usize] = *weight;
                }
                if total > power {
                    return Err(GovernanceError::VoteBudgetExceeded { cost: total, power });
                }
                delta.weight = total;
                delta.cost = total;
            }
            Self::Ranked { ranking } => {
                if ranking.len() != n {
                    return Err(GovernanceError::InvalidSelection(format!(
                        "ranking must order all {n} options"
                    )));
                }
                let mut seen = BTreeSet::new();
                for option in ranking {
                    check_option(*option, n)?;
                    if !seen.insert(*option) {
                        return Err(GovernanceError::InvalidSelection(format!(
                            "option {option} ranked twice"
                        )));
                    }
                }
                // Position k (1-based) of n scores (n - k) points.
                for (position, option) in ranking.iter().enumerate() {
                    let points = (n - 1 - position) as u128;
                    delta.ranked_scores[*option as usize] =
                        points.checked_mul(power).ok_or(GovernanceError::Overflow)?;
                }
                delta.options[ranking[0] as usize] = power;
                delta.weight = power;
                delta.cost = power;
            }
        }
        Ok(delta)
    }
}

fn check_option(option: u16, count: usize) -> Result<(), GovernanceError> {
    if (option as usize) < count {
        Ok(())
    } else {
        Err(GovernanceError::InvalidSelection(format!(
            "option {option} does not exist (proposal has {count})"
        )))
    }
}

/// Increments a single ballot adds to a proposal's tally.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TallyDelta {
    pub options: Vec<u128>,
    pub ranked_scores: Vec<u128>,
    /// Total weight recorded on the Vote.
    pub weight: u128,
    /// Power budget consumed.
    pub cost: u128,
}

impl TallyDelta {
    fn zero(n: usize) -> Self {
        Self {
            options: vec![0; n],
            ranked_scores: vec![0; n],
            weight: 0,
            cost: 0,
        }
    }

    /// Add to `proposal`'s tally, or fail without modifying it.
    fn apply(&self, proposal: &mut Proposal) -> Result<(), GovernanceError> {
        let tally = &proposal.tally;
        let options = add_all(&tally.options, &self.options)?;
        let ranked_scores = add_all(&tally.ranked_scores, &self.ranked_scores)?;
        let voters = tally.voters.checked_add(1).ok_or(GovernanceError::Overflow)?;
        proposal.tally.options = options;
        proposal.tally.ranked_scores = ranked_scores;
        proposal.tally.voters = voters;
        Ok(())
    }
}

fn add_all(current: &[u128], delta: &[u128]) -> Result<Vec<u128>, GovernanceError> {
    current
        .iter()
        .zip(delta)
        .map(|(a, b)| a.checked_add(*b).ok_or(GovernanceError::Overflow))
        .collect()
}

/// An immutable ballot record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub proposal_id: ProposalId,
    pub voter: AccountId,
    pub mode: VoteMode,
    pub selection: VoteSelection,
    /// Weight added to the tally.
    pub weight: u128,
    /// Power budget consumed (`weight²` in quadratic mode).
    pub cost: u128,
    /// Effective voting power when the vote was cast.
    pub power: u128,
    pub cast_at: Timestamp,
}

impl Vote {
    /// Standard-mode support, if this was a standard vote.
    pub fn support(&self) -> Option<bool> {
        match self.selection {
            VoteSelection::Standard { support } => Some(support),
            _ => None,
        }
    }
}

/// Table of cast votes, one per `(proposal, voter)`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VotingEngine {
    votes: BTreeMap<(ProposalId, AccountId), Vote>,
}

impl VotingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `voter`'s ballot on `proposal` and add it to the tally.
    pub fn cast(
        &mut self,
        proposal: &mut Proposal,
        voter: &AccountId,
        selection: VoteSelection,
        power: u128,
        now: Timestamp,
    ) -> Result<Vote, GovernanceError> {
        let key = (proposal.id, voter.clone());
        if self.votes.contains_key(&key) {
            return Err(GovernanceError::AlreadyVoted {
                proposal: proposal.id,
                voter: voter.clone(),
            });
        }
        if !proposal.is_active(now) {
            return Err(GovernanceError::VotingClosed(proposal.id));
        }
        if power == 0 {
            return Err(GovernanceError::NoVotingPower(voter.clone()));
        }

        let delta = selection.plan(proposal, power)?;
        delta.apply(proposal)?;

        let vote = Vote {
            proposal_id: proposal.id,
            voter: voter.clone(),
            mode: selection.mode(),
            selection,
            weight: delta.weight,
            cost: delta.cost,
            power,
            cast_at: now,
        };
        self.votes.insert(key, vote.clone());
        Ok(vote)
    }

    pub fn get(&self, proposal: ProposalId, voter: &AccountId) -> Option<&Vote> {
        self.votes.get(&(proposal, voter.clone()))
    }

    pub fn has_voted(&self, proposal: ProposalId, voter: &AccountId) -> bool {
        self.get(proposal, voter).is_some()
    }

    /// Votes on `proposal`, ordered by voter.
    pub fn votes_for(&self, proposal: ProposalId) -> impl Iterator<Item = &Vote> {
        self.votes
            .iter()
            .filter(move |((id, _), _)| *id == proposal)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vote> {
        self.votes.values()
    }

    pub fn len(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    pub fn restore(votes: impl IntoIterator<Item = Vote>) -> Self {
        Self {
            votes: votes
                .into_iter()
                .map(|v| ((v.proposal_id, v.voter.clone()), v))
                .collect(),
        }
    }
}
