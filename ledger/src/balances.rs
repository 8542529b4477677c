//! Liquid token balances.

use crate::error::LedgerError;
use agora_escrow::EscrowVault;
use agora_governance::Balances;
use agora_types::AccountId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceTable {
    balances: BTreeMap<AccountId, u128>,
}

impl BalanceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, account: &AccountId) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Sum of all liquid balances.
    pub fn total_supply(&self) -> u128 {
        self.balances
            .values()
            .fold(0u128, |acc, b| acc.saturating_add(*b))
    }

    pub fn credit(&mut self, account: &AccountId, amount: u128) -> Result<u128, LedgerError> {
        let current = self.balance_of(account);
        let next = current.checked_add(amount).ok_or(LedgerError::Overflow)?;
        self.balances.insert(account.clone(), next);
        Ok(next)
    }

    pub fn debit(&mut self, account: &AccountId, amount: u128) -> Result<u128, LedgerError> {
        let current = self.balance_of(account);
        let next = current
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                needed: amount,
                available: current,
            })?;
        if next == 0 {
            self.balances.remove(account);
        } else {
            self.balances.insert(account.clone(), next);
        }
        Ok(next)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AccountId, &u128)> {
        self.balances.iter()
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    pub fn restore(balances: impl IntoIterator<Item = (AccountId, u128)>) -> Self {
        Self {
            balances: balances.into_iter().filter(|(_, b)| *b > 0).collect(),
        }
    }
}

/// What governance sees: liquid balances plus escrowed stake.
pub struct BalanceView<'a> {
    balances: &'a BalanceTable,
    escrow: &'a EscrowVault,
}

impl<'a> BalanceView<'a> {
    pub fn new(balances: &'a BalanceTable, escrow: &'a EscrowVault) -> Self {
        Self { balances, escrow }
    }
}

impl Balances for BalanceView<'_> {
    fn balance_of(&self, account: &AccountId) -> u128 {
        self.balances.balance_of(account)
    }

    fn total_supply(&self) -> u128 {
        self.balances.total_supply()
    }

    fn staked(&self, account: &AccountId) -> u128 {
        self.escrow.active_stake(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_and_debit() {
        let mut table = BalanceTable::new();
        let alice = AccountId::new("alice");
        assert_eq!(table.credit(&alice, 100).unwrap(), 100);
        assert_eq!(table.debit(&alice, 40).unwrap(), 60);
        assert_eq!(table.total_supply(), 60);
        assert!(matches!(
            table.debit(&alice, 61),
            Err(LedgerError::InsufficientBalance {
                needed: 61,
                available: 60
            })
        ));
        assert_eq!(table.balance_of(&alice), 60);
    }

    #[test]
    fn emptied_accounts_are_dropped() {
        let mut table = BalanceTable::new();
        let bob = AccountId::new("bob");
        table.credit(&bob, 5).unwrap();
        table.debit(&bob, 5).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.balance_of(&bob), 0);
    }

    #[test]
    fn credit_overflow_is_rejected() {
        let mut table = BalanceTable::new();
        let carol = AccountId::new("carol");
        table.credit(&carol, u128::MAX).unwrap();
        assert!(matches!(table.credit(&carol, 1), Err(LedgerError::Overflow)));
    }
}
