//! Governance engine — ties proposals, votes, delegation and the timelock
//! together against an external balance source and governed system.
//!
//! Every method validates fully before its first write, so a returned error
//! means nothing changed.

use crate::action::ProposalAction;
use crate::delegation::{DelegateProfile, Delegation, DelegationRegistry};
use crate::error::GovernanceError;
use crate::proposal::{Proposal, ProposalDraft, ProposalRegistry, ProposalState};
use crate::timelock::{TimelockEntry, TimelockQueue};
use crate::voting::{Vote, VoteSelection, VotingEngine};
use agora_types::{AccountId, ProposalId, ProtocolParams, Timestamp};
use serde::{Deserialize, Serialize};

/// Read access to token balances.
pub trait Balances {
    /// Liquid balance of `account`.
    fn balance_of(&self, account: &AccountId) -> u128;
    /// Total voting supply, used for quorum.
    fn total_supply(&self) -> u128;
    /// Collateral `account` has locked in escrow. Used by the minimum
    /// proposal stake policy.
    fn staked(&self, _account: &AccountId) -> u128 {
        0
    }
}

/// The system executed proposals act upon.
pub trait GovernedSystem {
    fn dispatch(&mut self, proposal: ProposalId, action: &ProposalAction) -> Result<(), GovernanceError>;
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GovernanceEngine {
    proposals: ProposalRegistry,
    votes: VotingEngine,
    delegations: DelegationRegistry,
    timelock: TimelockQueue,
    admin: Option<AccountId>,
}

impl GovernanceEngine {
    pub fn new(admin: Option<AccountId>) -> Self {
        Self {
            admin,
            ..Self::default()
        }
    }

    pub fn from_parts(
        proposals: ProposalRegistry,
        votes: VotingEngine,
        delegations: DelegationRegistry,
        timelock: TimelockQueue,
        admin: Option<AccountId>,
    ) -> Self {
        Self {
            proposals,
            votes,
            delegations,
            timelock,
            admin,
        }
    }

    pub fn admin(&self) -> Option<&AccountId> {
        self.admin.as_ref()
    }

    fn require_admin(&self, caller: &AccountId) -> Result<(), GovernanceError> {
        match &self.admin {
            Some(admin) if admin == caller => Ok(()),
            _ => Err(GovernanceError::NotAdmin(caller.clone())),
        }
    }

    /// Whether `caller` is the governance admin.
    pub fn is_admin(&self, caller: &AccountId) -> bool {
        self.require_admin(caller).is_ok()
    }

    // ── Proposals ───────────────────────────────────────────────────────

    pub fn create_proposal(
        &mut self,
        proposer: &AccountId,
        draft: &ProposalDraft,
        balances: &impl Balances,
        params: &ProtocolParams,
        now: Timestamp,
    ) -> Result<ProposalId, GovernanceError> {
        let min_stake = params.min_proposal_stake as u128;
        if min_stake > 0 {
            let staked = balances.staked(proposer);
            if staked < min_stake {
                return Err(GovernanceError::InsufficientStake {
                    needed: min_stake,
                    available: staked,
                });
            }
        }
        let id = self
            .proposals
            .create(proposer, draft, params, balances.total_supply(), now)?;
        tracing::info!(proposal_id = %id, proposer = %proposer, kind = draft.kind, "proposal created");
        Ok(id)
    }

    pub fn cancel_proposal(
        &mut self,
        id: ProposalId,
        caller: &AccountId,
        now: Timestamp,
    ) -> Result<(), GovernanceError> {
        self.proposals.cancel(id, caller, self.admin.as_ref(), now)?;
        tracing::info!(proposal_id = %id, caller = %caller, "proposal cancelled");
        Ok(())
    }

    /// Lifecycle state, including the timelock overlay.
    pub fn state(&self, id: ProposalId, now: Timestamp) -> Result<ProposalState, GovernanceError> {
        let proposal = self.proposals.require(id)?;
        let base = proposal.state(now);
        Ok(match self.timelock.get(id) {
            Some(entry) if entry.cancelled => ProposalState::Cancelled,
            Some(entry) if entry.executed => ProposalState::Executed,
            Some(_) if base == ProposalState::Succeeded => ProposalState::Queued,
            _ => base,
        })
    }

    // ── Voting ──────────────────────────────────────────────────────────

    pub fn vote(
        &mut self,
        id: ProposalId,
        voter: &AccountId,
        selection: VoteSelection,
        balances: &impl Balances,
        now: Timestamp,
    ) -> Result<Vote, GovernanceError> {
        let power = self.voting_power(voter, balances);
        let proposal = self.proposals.require_mut(id)?;
        let vote = self.votes.cast(proposal, voter, selection, power, now)?;
        tracing::info!(
            proposal_id = %id,
            voter = %voter,
            mode = %vote.mode,
            weight = %vote.weight,
            "vote cast"
        );
        Ok(vote)
    }

    // ── Timelock ────────────────────────────────────────────────────────

    pub fn queue(
        &mut self,
        id: ProposalId,
        params: &ProtocolParams,
        now: Timestamp,
    ) -> Result<TimelockEntry, GovernanceError> {
        let proposal = self.proposals.require(id)?;
        let entry = self.timelock.queue(proposal, params, now)?.clone();
        tracing::info!(proposal_id = %id, eta = %entry.eta, "proposal queued");
        Ok(entry)
    }

    /// Execute a queued proposal once its ETA has passed. The action is
    /// dispatched first; if dispatch fails nothing is marked executed.
    pub fn execute(
        &mut self,
        id: ProposalId,
        system: &mut impl GovernedSystem,
        now: Timestamp,
    ) -> Result<ProposalAction, GovernanceError> {
        self.timelock.ensure_ready(id, now)?;
        let proposal = self.proposals.require(id)?;
        if proposal.executed || proposal.cancelled {
            return Err(GovernanceError::AlreadyFinalized(id));
        }
        let action = proposal.action.clone();
        system.dispatch(id, &action)?;

        self.timelock.mark_executed(id)?;
        self.proposals.require_mut(id)?.executed = true;
        tracing::info!(proposal_id = %id, action = %action, "proposal executed");
        Ok(action)
    }

    /// Cancel a queued proposal. Admin only; the proposal record itself is
    /// left as it was.
    pub fn cancel_queued(
        &mut self,
        id: ProposalId,
        caller: &AccountId,
    ) -> Result<TimelockEntry, GovernanceError> {
        self.require_admin(caller)?;
        let entry = self.timelock.cancel(id)?.clone();
        tracing::info!(proposal_id = %id, caller = %caller, "queued proposal cancelled");
        Ok(entry)
    }

    // ── Delegation ──────────────────────────────────────────────────────

    pub fn delegate(
        &mut self,
        delegator: &AccountId,
        delegate: &AccountId,
        amount: u128,
        balances: &impl Balances,
        now: Timestamp,
    ) -> Result<(), GovernanceError> {
        self.ensure_unlocked(delegator, now)?;
        self.ensure_unlocked(delegate, now)?;
        if let Some(current) = self.delegations.active(delegator) {
            self.ensure_unlocked(&current.delegate, now)?;
        }
        let own = balances.balance_of(delegator);
        self.delegations.delegate(delegator, delegate, amount, own, now)?;
        tracing::info!(delegator = %delegator, delegate = %delegate, amount = %amount, "delegated");
        Ok(())
    }

    pub fn undelegate(&mut self, delegator: &AccountId, now: Timestamp) -> Result<Delegation, GovernanceError> {
        self.ensure_unlocked(delegator, now)?;
        if let Some(current) = self.delegations.active(delegator) {
            self.ensure_unlocked(&current.delegate, now)?;
        }
        let cleared = self.delegations.undelegate(delegator, now)?;
        tracing::info!(
            delegator = %delegator,
            delegate = %cleared.delegate,
            amount = %cleared.amount,
            "undelegated"
        );
        Ok(cleared)
    }

    /// Voting power may not move into or out of an account that holds a
    /// ballot on a proposal still open for voting.
    fn ensure_unlocked(&self, account: &AccountId, now: Timestamp) -> Result<(), GovernanceError> {
        let open = self
            .votes
            .iter()
            .filter(|vote| &vote.voter == account)
            .map(|vote| vote.proposal_id)
            .find(|id| self.proposals.get(*id).is_some_and(|p| p.is_active(now)));
        match open {
            Some(proposal) => Err(GovernanceError::DelegationLocked {
                account: account.clone(),
                proposal,
            }),
            None => Ok(()),
        }
    }

    pub fn register_delegate(
        &mut self,
        address: &AccountId,
        name: &str,
        description: &str,
        now: Timestamp,
    ) -> Result<DelegateProfile, GovernanceError> {
        let profile = self
            .delegations
            .register_delegate(address, name, description, now)?
            .clone();
        tracing::info!(delegate = %address, name = %profile.name, "delegate registered");
        Ok(profile)
    }

    // ── Reads ───────────────────────────────────────────────────────────

    pub fn voting_power(&self, account: &AccountId, balances: &impl Balances) -> u128 {
        self.delegations
            .voting_power(account, balances.balance_of(account))
    }

    /// Part of `account`'s balance currently delegated away.
    pub fn delegated_away(&self, account: &AccountId) -> u128 {
        self.delegations.delegated_away(account)
    }

    pub fn proposal(&self, id: ProposalId) -> Option<&Proposal> {
        self.proposals.get(id)
    }

    pub fn proposals(&self) -> &ProposalRegistry {
        &self.proposals
    }

    pub fn votes(&self) -> &VotingEngine {
        &self.votes
    }

    pub fn delegations(&self) -> &DelegationRegistry {
        &self.delegations
    }

    pub fn timelock(&self) -> &TimelockQueue {
        &self.timelock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    const DAY: u64 = 24 * 3600;

    #[derive(Default)]
    struct Book {
        balances: BTreeMap<AccountId, u128>,
        staked: BTreeMap<AccountId, u128>,
    }

    impl Book {
        fn with(entries: &[(&str, u128)]) -> Self {
            Self {
                balances: entries.iter().map(|(a, b)| (AccountId::new(*a), *b)).collect(),
                staked: BTreeMap::new(),
            }
        }
    }

    impl Balances for Book {
        fn balance_of(&self, account: &AccountId) -> u128 {
            self.balances.get(account).copied().unwrap_or(0)
        }
        fn total_supply(&self) -> u128 {
            self.balances.values().sum()
        }
        fn staked(&self, account: &AccountId) -> u128 {
            self.staked.get(account).copied().unwrap_or(0)
        }
    }

    #[derive(Default)]
    struct Recorder {
        dispatched: Vec<ProposalId>,
        fail: bool,
    }

    impl GovernedSystem for Recorder {
        fn dispatch(&mut self, proposal: ProposalId, _action: &ProposalAction) -> Result<(), GovernanceError> {
            if self.fail {
                return Err(GovernanceError::Dispatch("rejected".into()));
            }
            self.dispatched.push(proposal);
            Ok(())
        }
    }

    fn a(name: &str) -> AccountId {
        AccountId::new(name)
    }

    fn t(secs: u64) -> Timestamp {
        Timestamp::new(secs)
    }

    fn draft() -> ProposalDraft {
        ProposalDraft::new("Fee", "Lower fee", &ProposalAction::PlatformFeeUpdate { fee_bps: 5 }).unwrap()
    }

    #[test]
    fn full_lifecycle_scenario() {
        let book = Book::with(&[("alice", 150), ("bob", 50), ("carol", 800)]);
        let params = ProtocolParams::standard();
        let mut engine = GovernanceEngine::new(Some(a("admin")));
        let mut system = Recorder::default();

        let id = engine
            .create_proposal(&a("alice"), &draft(), &book, &params, t(0))
            .unwrap();
        engine
            .vote(id, &a("alice"), VoteSelection::Standard { support: true }, &book, t(10))
            .unwrap();
        engine
            .vote(id, &a("bob"), VoteSelection::Standard { support: false }, &book, t(20))
            .unwrap();
        assert_eq!(engine.state(id, t(30)).unwrap(), ProposalState::Active);
        assert_eq!(engine.state(id, t(7 * DAY)).unwrap(), ProposalState::Succeeded);

        let entry = engine.queue(id, &params, t(7 * DAY + 1)).unwrap();
        assert_eq!(entry.eta, t(9 * DAY + 1));
        assert_eq!(engine.state(id, t(8 * DAY)).unwrap(), ProposalState::Queued);

        assert!(matches!(
            engine.execute(id, &mut system, t(9 * DAY)),
            Err(GovernanceError::TimelockNotExpired { .. })
        ));
        engine.execute(id, &mut system, t(9 * DAY + 1)).unwrap();
        assert_eq!(system.dispatched, vec![id]);
        assert_eq!(engine.state(id, t(10 * DAY)).unwrap(), ProposalState::Executed);
        assert_eq!(
            engine.execute(id, &mut system, t(10 * DAY)),
            Err(GovernanceError::AlreadyExecuted(id))
        );
        assert_eq!(system.dispatched.len(), 1);
    }

    #[test]
    fn dispatch_failure_leaves_proposal_queued() {
        let book = Book::with(&[("alice", 1000)]);
        let params = ProtocolParams::standard();
        let mut engine = GovernanceEngine::new(None);
        let id = engine.create_proposal(&a("alice"), &draft(), &book, &params, t(0)).unwrap();
        engine
            .vote(id, &a("alice"), VoteSelection::Standard { support: true }, &book, t(1))
            .unwrap();
        engine.queue(id, &params, t(8 * DAY)).unwrap();

        let mut system = Recorder {
            fail: true,
            ..Recorder::default()
        };
        assert!(matches!(
            engine.execute(id, &mut system, t(20 * DAY)),
            Err(GovernanceError::Dispatch(_))
        ));
        assert!(engine.timelock().get(id).unwrap().is_pending());
        assert!(!engine.proposal(id).unwrap().executed);
    }

    #[test]
    fn delegation_changes_voting_power() {
        let book = Book::with(&[("dora", 1000), ("rep", 10)]);
        let mut engine = GovernanceEngine::new(None);
        engine.delegate(&a("dora"), &a("rep"), 400, &book, t(0)).unwrap();
        assert_eq!(engine.voting_power(&a("dora"), &book), 600);
        assert_eq!(engine.voting_power(&a("rep"), &book), 410);

        engine.undelegate(&a("dora"), t(1)).unwrap();
        assert_eq!(engine.voting_power(&a("dora"), &book), 1000);
        assert_eq!(engine.voting_power(&a("rep"), &book), 10);
    }

    #[test]
    fn delegated_power_is_voted_by_delegate() {
        let book = Book::with(&[("dora", 900), ("rep", 100)]);
        let params = ProtocolParams::standard();
        let mut engine = GovernanceEngine::new(None);
        engine.delegate(&a("dora"), &a("rep"), 900, &book, t(0)).unwrap();
        let id = engine.create_proposal(&a("rep"), &draft(), &book, &params, t(0)).unwrap();

        assert_eq!(
            engine.vote(id, &a("dora"), VoteSelection::Standard { support: false }, &book, t(1)),
            Err(GovernanceError::NoVotingPower(a("dora")))
        );
        let vote = engine
            .vote(id, &a("rep"), VoteSelection::Standard { support: true }, &book, t(1))
            .unwrap();
        assert_eq!(vote.weight, 1000);
    }

    #[test]
    fn voted_power_cannot_be_delegated_to_a_second_voter() {
        let book = Book::with(&[("alice", 1000), ("bob", 0)]);
        let params = ProtocolParams::standard();
        let mut engine = GovernanceEngine::new(None);
        let id = engine.create_proposal(&a("alice"), &draft(), &book, &params, t(0)).unwrap();
        engine
            .vote(id, &a("alice"), VoteSelection::Standard { support: true }, &book, t(1))
            .unwrap();

        assert_eq!(
            engine.delegate(&a("alice"), &a("bob"), 1000, &book, t(2)),
            Err(GovernanceError::DelegationLocked {
                account: a("alice"),
                proposal: id
            })
        );
        assert_eq!(
            engine.vote(id, &a("bob"), VoteSelection::Standard { support: true }, &book, t(3)),
            Err(GovernanceError::NoVotingPower(a("bob")))
        );
        let proposal = engine.proposal(id).unwrap();
        assert!(proposal.for_votes() <= book.total_supply());

        // The lock lifts when voting closes.
        engine.delegate(&a("alice"), &a("bob"), 1000, &book, t(7 * DAY)).unwrap();
    }

    #[test]
    fn delegate_ballot_pins_the_delegation() {
        let book = Book::with(&[("alice", 1000), ("bob", 0), ("carol", 0)]);
        let params = ProtocolParams::standard();
        let mut engine = GovernanceEngine::new(None);
        engine.delegate(&a("alice"), &a("bob"), 1000, &book, t(0)).unwrap();
        let id = engine.create_proposal(&a("alice"), &draft(), &book, &params, t(0)).unwrap();
        engine
            .vote(id, &a("bob"), VoteSelection::Standard { support: true }, &book, t(1))
            .unwrap();

        let locked = GovernanceError::DelegationLocked {
            account: a("bob"),
            proposal: id,
        };
        assert_eq!(engine.undelegate(&a("alice"), t(2)), Err(locked.clone()));
        assert_eq!(engine.delegate(&a("alice"), &a("carol"), 1000, &book, t(2)), Err(locked));
        assert_eq!(
            engine.vote(id, &a("alice"), VoteSelection::Standard { support: false }, &book, t(3)),
            Err(GovernanceError::NoVotingPower(a("alice")))
        );
        assert_eq!(engine.proposal(id).unwrap().tally.participation(), 1000);
    }

    #[test]
    fn queue_cancel_is_admin_only() {
        let book = Book::with(&[("alice", 1000)]);
        let params = ProtocolParams::standard();
        let mut engine = GovernanceEngine::new(Some(a("admin")));
        let id = engine.create_proposal(&a("alice"), &draft(), &book, &params, t(0)).unwrap();
        engine
            .vote(id, &a("alice"), VoteSelection::Standard { support: true }, &book, t(1))
            .unwrap();
        engine.queue(id, &params, t(8 * DAY)).unwrap();

        assert_eq!(
            engine.cancel_queued(id, &a("alice")),
            Err(GovernanceError::NotAdmin(a("alice")))
        );
        engine.cancel_queued(id, &a("admin")).unwrap();
        assert_eq!(engine.state(id, t(9 * DAY)).unwrap(), ProposalState::Cancelled);
        // The proposal record keeps its vote outcome for audit.
        assert_eq!(engine.proposal(id).unwrap().state(t(9 * DAY)), ProposalState::Succeeded);
        assert_eq!(
            engine.execute(id, &mut Recorder::default(), t(20 * DAY)),
            Err(GovernanceError::QueueCancelled(id))
        );
    }

    #[test]
    fn minimum_stake_gates_proposals() {
        let mut book = Book::with(&[("alice", 1000)]);
        let params = ProtocolParams {
            min_proposal_stake: 100,
            ..ProtocolParams::standard()
        };
        let mut engine = GovernanceEngine::new(None);
        assert_eq!(
            engine.create_proposal(&a("alice"), &draft(), &book, &params, t(0)),
            Err(GovernanceError::InsufficientStake {
                needed: 100,
                available: 0
            })
        );
        book.staked.insert(a("alice"), 100);
        assert!(engine.create_proposal(&a("alice"), &draft(), &book, &params, t(0)).is_ok());
    }

    #[test]
    fn no_admin_means_no_queue_cancel() {
        let engine = GovernanceEngine::new(None);
        assert!(!engine.is_admin(&a("anyone")));
    }
}
