//! Mandatory delay between a proposal succeeding and its execution.
//!
//! `Queued → {Executed | Cancelled}`, both terminal.

use crate::error::GovernanceError;
use crate::proposal::Proposal;
use agora_types::{ProposalId, ProtocolParams, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelockEntry {
    pub proposal_id: ProposalId,
    /// Earliest execution instant.
    pub eta: Timestamp,
    pub queued_at: Timestamp,
    pub executed: bool,
    pub cancelled: bool,
}

impl TimelockEntry {
    pub fn is_pending(&self) -> bool {
        !self.executed && !self.cancelled
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TimelockQueue {
    entries: BTreeMap<ProposalId, TimelockEntry>,
}

impl TimelockQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay applied to a proposal: emergency proposals use the short delay.
    pub fn delay_for(proposal: &Proposal, params: &ProtocolParams) -> u64 {
        if proposal.kind.is_emergency() {
            params.emergency_delay_secs
        } else {
            params.timelock_delay_secs
        }
    }

    /// Queue a succeeded proposal. `eta = now + delay`.
    pub fn queue(
        &mut self,
        proposal: &Proposal,
        params: &ProtocolParams,
        now: Timestamp,
    ) -> Result<&TimelockEntry, GovernanceError> {
        let id = proposal.id;
        if self.entries.contains_key(&id) {
            return Err(GovernanceError::AlreadyQueued(id));
        }
        if !proposal.voting_ended(now) {
            return Err(GovernanceError::VotingNotEnded(id));
        }
        if proposal.executed || proposal.cancelled {
            return Err(GovernanceError::AlreadyFinalized(id));
        }
        if !proposal.can_queue(now) {
            return Err(GovernanceError::NotSucceeded(id));
        }
        let entry = TimelockEntry {
            proposal_id: id,
            eta: now.plus(Self::delay_for(proposal, params)),
            queued_at: now,
            executed: false,
            cancelled: false,
        };
        Ok(self.entries.entry(id).or_insert(entry))
    }

    /// Check that `id` may execute at `now`.
    pub fn ensure_ready(&self, id: ProposalId, now: Timestamp) -> Result<&TimelockEntry, GovernanceError> {
        let entry = self.entries.get(&id).ok_or(GovernanceError::NotQueued(id))?;
        if entry.executed {
            return Err(GovernanceError::AlreadyExecuted(id));
        }
        if entry.cancelled {
            return Err(GovernanceError::QueueCancelled(id));
        }
        if now < entry.eta {
            return Err(GovernanceError::TimelockNotExpired {
                id,
                eta: entry.eta,
                now,
            });
        }
        Ok(entry)
    }

    /// Mark `id` executed. Call only after [`ensure_ready`](Self::ensure_ready)
    /// succeeded and the action was dispatched.
    pub(crate) fn mark_executed(&mut self, id: ProposalId) -> Result<(), GovernanceError> {
        let entry = self.entries.get_mut(&id).ok_or(GovernanceError::NotQueued(id))?;
        entry.executed = true;
        Ok(())
    }

    /// Cancel a queued, not yet executed entry.
    pub fn cancel(&mut self, id: ProposalId) -> Result<&TimelockEntry, GovernanceError> {
        let entry = self.entries.get_mut(&id).ok_or(GovernanceError::NotQueued(id))?;
        if entry.executed {
            return Err(GovernanceError::AlreadyExecuted(id));
        }
        if entry.cancelled {
            return Err(GovernanceError::QueueCancelled(id));
        }
        entry.cancelled = true;
        Ok(entry)
    }

    pub fn get(&self, id: ProposalId) -> Option<&TimelockEntry> {
        self.entries.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimelockEntry> {
        self.entries.values()
    }

    pub fn restore(entries: impl IntoIterator<Item = TimelockEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.proposal_id, e)).collect(),
        }
    }
}
