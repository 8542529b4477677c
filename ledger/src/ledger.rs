//! The ledger: current state, command application, and persistence.

use crate::balances::BalanceTable;
use crate::command::{Envelope, Receipt};
use crate::error::LedgerError;
use crate::genesis::GenesisConfig;
use crate::settings::ProtocolSettings;
use crate::state::{transition, LedgerState};
use agora_escrow::{EscrowPosition, EscrowVault, RateHistory, RewardAccount};
use agora_governance::{
    DelegateProfile, Delegation, DelegationRegistry, GovernanceEngine, Proposal, ProposalRegistry,
    TimelockEntry, TimelockQueue, Vote, VotingEngine,
};
use agora_store::keys::{account_key, decode_account_key, proposal_key, vote_key};
use agora_store::{
    decode_all, LedgerStore, StoreError, Table, WriteBatch, CURRENT_SCHEMA_VERSION,
    SCHEMA_VERSION_KEY,
};
use agora_types::{AccountId, Timestamp};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;

const SETTINGS_KEY: &[u8] = b"settings";
const ADMIN_KEY: &[u8] = b"admin";
const REWARD_RATES_KEY: &[u8] = b"reward_rates";
const SEQUENCE_KEY: &[u8] = b"sequence";

/// Summary statistics about the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LedgerSummary {
    pub sequence: u64,
    pub accounts: usize,
    pub total_supply: u128,
    pub total_locked: u128,
    pub proposals: usize,
    pub votes: usize,
}

#[derive(Clone, Debug, Default)]
pub struct Ledger {
    state: LedgerState,
}

impl Ledger {
    pub fn new(state: LedgerState) -> Self {
        Self { state }
    }

    pub fn from_genesis(config: &GenesisConfig, genesis_time: Timestamp) -> Result<Self, LedgerError> {
        let state = config.build(genesis_time)?;
        tracing::info!(
            accounts = state.balances().len(),
            total_supply = %state.total_supply(),
            "ledger created from genesis"
        );
        Ok(Self { state })
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    /// Apply one command. A rejected command leaves the ledger untouched.
    pub fn apply(&mut self, envelope: &Envelope, now: Timestamp) -> Result<Receipt, LedgerError> {
        match transition(&self.state, envelope, now) {
            Ok((next, receipt)) => {
                self.state = next;
                tracing::info!(
                    sequence = receipt.sequence,
                    caller = %envelope.caller,
                    command = envelope.command.name(),
                    "command committed"
                );
                Ok(receipt)
            }
            Err(e) => {
                tracing::debug!(
                    caller = %envelope.caller,
                    command = envelope.command.name(),
                    kind = e.kind().as_str(),
                    error = %e,
                    "command rejected"
                );
                Err(e)
            }
        }
    }

    pub fn summary(&self) -> LedgerSummary {
        LedgerSummary {
            sequence: self.state.sequence(),
            accounts: self.state.balances().len(),
            total_supply: self.state.total_supply(),
            total_locked: self.state.escrow().total_locked(),
            proposals: self.state.governance().proposals().len(),
            votes: self.state.governance().votes().len(),
        }
    }

    // ── Persistence ─────────────────────────────────────────────────────

    /// Write every table in one atomic batch, replacing what was stored.
    pub fn save(&self, store: &impl LedgerStore) -> Result<(), LedgerError> {
        let mut batch = WriteBatch::new();
        for table in Table::ALL {
            batch.clear(table);
        }
        batch.put(Table::Meta, SCHEMA_VERSION_KEY, CURRENT_SCHEMA_VERSION.to_le_bytes());
        write_changes(&mut batch, &LedgerState::default(), &self.state, true)?;
        let ops = batch.len();
        store.commit(batch)?;
        tracing::debug!(sequence = self.state.sequence(), ops, "ledger saved");
        Ok(())
    }

    /// Persist only the records that differ from `previous`, which must be
    /// the state the store currently holds.
    pub fn save_changes(&self, previous: &LedgerState, store: &impl LedgerStore) -> Result<(), LedgerError> {
        let mut batch = WriteBatch::new();
        write_changes(&mut batch, previous, &self.state, false)?;
        let ops = batch.len();
        store.commit(batch)?;
        tracing::debug!(sequence = self.state.sequence(), ops, "ledger changes saved");
        Ok(())
    }

    /// Restore a saved ledger. `None` if the store holds none.
    pub fn load(store: &impl LedgerStore) -> Result<Option<Self>, LedgerError> {
        let Some(sequence) = store.get_value::<u64>(Table::Meta, SEQUENCE_KEY)? else {
            return Ok(None);
        };
        let settings: ProtocolSettings = require_meta(store, SETTINGS_KEY)?;
        let admin: Option<AccountId> = require_meta(store, ADMIN_KEY)?;
        let rates: RateHistory = require_meta(store, REWARD_RATES_KEY)?;

        let proposals = values::<Proposal>(store, Table::Proposals)?;
        let votes = values::<Vote>(store, Table::Votes)?;
        let timelock = values::<TimelockEntry>(store, Table::Timelock)?;
        let delegations = by_account::<Delegation>(store, Table::Delegations)?;
        let profiles = by_account::<DelegateProfile>(store, Table::DelegateProfiles)?;
        let positions = by_account::<Vec<EscrowPosition>>(store, Table::EscrowPositions)?;
        let rewards = by_account::<RewardAccount>(store, Table::RewardAccounts)?;
        let balances = by_account::<u128>(store, Table::Balances)?;

        let governance = GovernanceEngine::from_parts(
            ProposalRegistry::restore(proposals),
            VotingEngine::restore(votes),
            DelegationRegistry::restore(delegations, profiles),
            TimelockQueue::restore(timelock),
            admin,
        );
        let state = LedgerState::from_parts(
            BalanceTable::restore(balances),
            governance,
            EscrowVault::restore(positions, rewards, rates),
            settings,
            sequence,
        );
        tracing::info!(sequence, "ledger loaded");
        Ok(Some(Self { state }))
    }
}

/// Stage puts for new or changed records and deletes for removed ones.
fn write_changes(
    batch: &mut WriteBatch,
    before: &LedgerState,
    after: &LedgerState,
    full: bool,
) -> Result<(), StoreError> {
    let (old, new) = (before.governance(), after.governance());
    diff_table(
        batch,
        Table::Proposals,
        old.proposals().iter().map(|p| (proposal_key(p.id).to_vec(), p)),
        new.proposals().iter().map(|p| (proposal_key(p.id).to_vec(), p)),
    )?;
    diff_table(
        batch,
        Table::Votes,
        old.votes().iter().map(|v| (vote_key(v.proposal_id, &v.voter), v)),
        new.votes().iter().map(|v| (vote_key(v.proposal_id, &v.voter), v)),
    )?;
    diff_table(
        batch,
        Table::Delegations,
        old.delegations().delegations().map(|(a, d)| (account_key(a), d)),
        new.delegations().delegations().map(|(a, d)| (account_key(a), d)),
    )?;
    diff_table(
        batch,
        Table::DelegateProfiles,
        old.delegations().profiles().map(|(a, p)| (account_key(a), p)),
        new.delegations().profiles().map(|(a, p)| (account_key(a), p)),
    )?;
    diff_table(
        batch,
        Table::Timelock,
        old.timelock().iter().map(|e| (proposal_key(e.proposal_id).to_vec(), e)),
        new.timelock().iter().map(|e| (proposal_key(e.proposal_id).to_vec(), e)),
    )?;
    diff_table(
        batch,
        Table::EscrowPositions,
        before.escrow().all_positions().map(|(a, p)| (account_key(a), p)),
        after.escrow().all_positions().map(|(a, p)| (account_key(a), p)),
    )?;
    diff_table(
        batch,
        Table::RewardAccounts,
        before.escrow().all_rewards().map(|(a, r)| (account_key(a), r)),
        after.escrow().all_rewards().map(|(a, r)| (account_key(a), r)),
    )?;
    diff_table(
        batch,
        Table::Balances,
        before.balances().iter().map(|(a, b)| (account_key(a), b)),
        after.balances().iter().map(|(a, b)| (account_key(a), b)),
    )?;

    if full || before.settings() != after.settings() {
        batch.put_value(Table::Meta, SETTINGS_KEY, after.settings())?;
    }
    if full || old.admin() != new.admin() {
        batch.put_value(Table::Meta, ADMIN_KEY, &new.admin())?;
    }
    if full || before.escrow().rates() != after.escrow().rates() {
        batch.put_value(Table::Meta, REWARD_RATES_KEY, after.escrow().rates())?;
    }
    batch.put_value(Table::Meta, SEQUENCE_KEY, &after.sequence())?;
    Ok(())
}

fn diff_table<'a, T>(
    batch: &mut WriteBatch,
    table: Table,
    before: impl Iterator<Item = (Vec<u8>, &'a T)>,
    after: impl Iterator<Item = (Vec<u8>, &'a T)>,
) -> Result<(), StoreError>
where
    T: PartialEq + Serialize + 'a,
{
    let mut stale: BTreeMap<Vec<u8>, &T> = before.collect();
    for (key, value) in after {
        match stale.remove(&key) {
            Some(old) if old == value => {}
            _ => batch.put_value(table, key, value)?,
        }
    }
    for key in stale.into_keys() {
        batch.delete(table, key);
    }
    Ok(())
}

fn require_meta<T: DeserializeOwned>(store: &impl LedgerStore, key: &[u8]) -> Result<T, StoreError> {
    store.get_value(Table::Meta, key)?.ok_or_else(|| {
        StoreError::Corruption(format!(
            "meta record {} missing",
            String::from_utf8_lossy(key)
        ))
    })
}

fn values<T: DeserializeOwned>(store: &impl LedgerStore, table: Table) -> Result<Vec<T>, StoreError> {
    Ok(decode_all::<T>(store.iter(table)?)?
        .into_iter()
        .map(|(_, v)| v)
        .collect())
}

fn by_account<T: DeserializeOwned>(
    store: &impl LedgerStore,
    table: Table,
) -> Result<Vec<(AccountId, T)>, StoreError> {
    decode_all::<T>(store.iter(table)?)?
        .into_iter()
        .map(|(k, v)| Ok((decode_account_key(&k)?, v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::genesis::Allocation;
    use agora_governance::{ProposalAction, ProposalDraft, VoteSelection};
    use agora_nullables::NullStore;
    use agora_types::{ProposalId, ProtocolParams};

    fn genesis() -> GenesisConfig {
        GenesisConfig {
            admin: Some(AccountId::new("admin")),
            allocations: vec![
                Allocation {
                    account: AccountId::new("alice"),
                    amount: 600,
                },
                Allocation {
                    account: AccountId::new("bob"),
                    amount: 400,
                },
            ],
            params: ProtocolParams::standard(),
        }
    }

    fn submit(ledger: &mut Ledger, caller: &str, command: Command, at: u64) -> Result<Receipt, LedgerError> {
        ledger.apply(&Envelope::new(AccountId::new(caller), command), Timestamp::new(at))
    }

    #[test]
    fn rejected_command_leaves_state_untouched() {
        let mut ledger = Ledger::from_genesis(&genesis(), Timestamp::EPOCH).unwrap();
        let before = ledger.summary();
        let err = submit(&mut ledger, "alice", Command::Escrow { amount: 601 }, 10).unwrap_err();
        assert!(matches!(err, LedgerError::Escrow(_)));
        assert_eq!(ledger.summary(), before);
        assert_eq!(ledger.state().balance_of(&AccountId::new("alice")), 600);
    }

    #[test]
    fn sequence_counts_committed_commands() {
        let mut ledger = Ledger::from_genesis(&genesis(), Timestamp::EPOCH).unwrap();
        let receipt = submit(&mut ledger, "alice", Command::Escrow { amount: 100 }, 10).unwrap();
        assert_eq!(receipt.sequence, 1);
        assert_eq!(receipt.command, "escrow");
        assert!(submit(&mut ledger, "alice", Command::Undelegate, 11).is_err());
        assert_eq!(ledger.state().sequence(), 1);
    }

    #[test]
    fn save_then_load_restores_every_table() {
        let mut ledger = Ledger::from_genesis(&genesis(), Timestamp::EPOCH).unwrap();
        let action = ProposalAction::PlatformFeeUpdate { fee_bps: 30 };
        submit(
            &mut ledger,
            "alice",
            Command::CreateProposal {
                draft: ProposalDraft::new("Fee", "Lower the fee", &action).unwrap(),
            },
            1,
        )
        .unwrap();
        submit(
            &mut ledger,
            "alice",
            Command::Delegate {
                delegate: AccountId::new("bob"),
                amount: 100,
            },
            2,
        )
        .unwrap();
        submit(
            &mut ledger,
            "bob",
            Command::Vote {
                proposal_id: ProposalId::new(1),
                selection: VoteSelection::Standard { support: true },
            },
            3,
        )
        .unwrap();
        submit(&mut ledger, "bob", Command::Escrow { amount: 50 }, 4).unwrap();

        let store = NullStore::new();
        ledger.save(&store).unwrap();
        assert_eq!(store.commit_count(), 1);

        let restored = Ledger::load(&store).unwrap().unwrap();
        assert_eq!(restored.summary(), ledger.summary());
        let bob = AccountId::new("bob");
        assert_eq!(restored.state().voting_power(&bob), ledger.state().voting_power(&bob));
        assert_eq!(restored.state().positions(&bob), ledger.state().positions(&bob));
        assert_eq!(
            restored.state().proposal(ProposalId::new(1), Timestamp::new(5)),
            ledger.state().proposal(ProposalId::new(1), Timestamp::new(5))
        );
        assert!(restored.state().governance().is_admin(&AccountId::new("admin")));
    }

    #[test]
    fn incremental_save_writes_only_touched_records() {
        let mut ledger = Ledger::from_genesis(&genesis(), Timestamp::EPOCH).unwrap();
        let store = NullStore::new();
        ledger.save(&store).unwrap();

        let previous = ledger.state().clone();
        submit(
            &mut ledger,
            "alice",
            Command::Delegate {
                delegate: AccountId::new("bob"),
                amount: 100,
            },
            1,
        )
        .unwrap();
        ledger.save_changes(&previous, &store).unwrap();
        // delegation, bob's profile, sequence
        assert_eq!(store.last_batch_ops(), 3);
        assert_eq!(store.len(Table::Balances).unwrap(), 2);

        let previous = ledger.state().clone();
        submit(&mut ledger, "alice", Command::Undelegate, 2).unwrap();
        ledger.save_changes(&previous, &store).unwrap();
        assert_eq!(store.last_batch_ops(), 3);

        let restored = Ledger::load(&store).unwrap().unwrap();
        assert_eq!(restored.summary(), ledger.summary());
        assert_eq!(
            restored.state().voting_power(&AccountId::new("bob")),
            ledger.state().voting_power(&AccountId::new("bob"))
        );
    }

    #[test]
    fn load_from_empty_store_is_none() {
        assert!(Ledger::load(&NullStore::new()).unwrap().is_none());
    }

    #[test]
    fn failed_save_reports_storage_error() {
        let ledger = Ledger::from_genesis(&genesis(), Timestamp::EPOCH).unwrap();
        let store = NullStore::new();
        store.fail_commits(true);
        assert!(matches!(ledger.save(&store), Err(LedgerError::Storage(_))));
    }
}
