//! Vote delegation — entrust part of a balance to a representative.
//!
//! Each delegator has at most one active delegation, bounded by an amount.
//! Delegating again *replaces* the previous delegation in one step; the old
//! delegate's counters are decremented before the new one's are incremented,
//! so profile totals never double-count.
//!
//! Power can be delegated to any address. Registering a [`DelegateProfile`]
//! only makes a delegate discoverable through [`DelegationRegistry::list_delegates`].

use crate::error::GovernanceError;
use agora_types::{AccountId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MAX_DELEGATE_NAME_LEN: usize = 64;
pub const MAX_DELEGATE_DESCRIPTION_LEN: usize = 1000;

/// A delegator's current (or last) delegation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    pub delegate: AccountId,
    pub amount: u128,
    pub timestamp: Timestamp,
    /// Cleared by undelegate; the record is kept for history.
    pub active: bool,
}

/// Public information about a delegate, plus the counters derived from
/// active delegations pointing at it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateProfile {
    pub name: String,
    pub description: String,
    pub total_delegated: u128,
    pub delegator_count: u64,
    pub registered: bool,
    pub registration_time: Option<Timestamp>,
}

/// Owns delegation relationships and delegate profiles.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DelegationRegistry {
    delegations: BTreeMap<AccountId, Delegation>,
    profiles: BTreeMap<AccountId, DelegateProfile>,
}

impl DelegationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delegate `amount` of `own_balance` to `delegate`, replacing any active
    /// delegation. The replaced amount is released in the same step, so the
    /// bound is checked against the whole balance.
    pub fn delegate(
        &mut self,
        delegator: &AccountId,
        delegate: &AccountId,
        amount: u128,
        own_balance: u128,
        now: Timestamp,
    ) -> Result<(), GovernanceError> {
        if delegator == delegate {
            return Err(GovernanceError::SelfDelegation);
        }
        if amount == 0 {
            return Err(GovernanceError::ZeroAmount);
        }
        if amount > own_balance {
            return Err(GovernanceError::InsufficientBalance {
                needed: amount,
                available: own_balance,
            });
        }

        // Check the increment before touching anything.
        let replaced = self.active(delegator).cloned();
        let target_total = self.profiles.get(delegate).map_or(0, |p| p.total_delegated);
        let released = match &replaced {
            Some(old) if &old.delegate == delegate => old.amount,
            _ => 0,
        };
        target_total
            .checked_sub(released)
            .and_then(|t| t.checked_add(amount))
            .ok_or(GovernanceError::Overflow)?;

        if let Some(old) = replaced {
            self.detach(&old.delegate, old.amount);
        }
        let profile = self.profiles.entry(delegate.clone()).or_default();
        profile.total_delegated = profile.total_delegated.saturating_add(amount);
        profile.delegator_count += 1;

        self.delegations.insert(
            delegator.clone(),
            Delegation {
                delegate: delegate.clone(),
                amount,
                timestamp: now,
                active: true,
            },
        );
        Ok(())
    }

    /// Clear the active delegation and return it.
    pub fn undelegate(
        &mut self,
        delegator: &AccountId,
        now: Timestamp,
    ) -> Result<Delegation, GovernanceError> {
        let record = self
            .delegations
            .get_mut(delegator)
            .filter(|d| d.active)
            .ok_or_else(|| GovernanceError::NoActiveDelegation(delegator.clone()))?;
        record.active = false;
        record.timestamp = now;
        let cleared = record.clone();
        self.detach(&cleared.delegate, cleared.amount);
        Ok(cleared)
    }

    /// Create or update a delegate profile. The first registration time and
    /// the delegation counters are preserved across updates.
    pub fn register_delegate(
        &mut self,
        address: &AccountId,
        name: &str,
        description: &str,
        now: Timestamp,
    ) -> Result<&DelegateProfile, GovernanceError> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > MAX_DELEGATE_NAME_LEN {
            return Err(GovernanceError::InvalidProfile(format!(
                "name must be 1..={MAX_DELEGATE_NAME_LEN} characters"
            )));
        }
        if description.chars().count() > MAX_DELEGATE_DESCRIPTION_LEN {
            return Err(GovernanceError::InvalidProfile(format!(
                "description exceeds {MAX_DELEGATE_DESCRIPTION_LEN} characters"
            )));
        }
        let profile = self.profiles.entry(address.clone()).or_default();
        profile.name = name.to_string();
        profile.description = description.to_string();
        if !profile.registered {
            profile.registered = true;
            profile.registration_time = Some(now);
        }
        Ok(profile)
    }

    fn detach(&mut self, delegate: &AccountId, amount: u128) {
        if let Some(profile) = self.profiles.get_mut(delegate) {
            profile.total_delegated = profile.total_delegated.saturating_sub(amount);
            profile.delegator_count = profile.delegator_count.saturating_sub(1);
        }
    }

    /// Active delegation of `delegator`, if any.
    pub fn active(&self, delegator: &AccountId) -> Option<&Delegation> {
        self.delegations.get(delegator).filter(|d| d.active)
    }

    /// Latest delegation record of `delegator`, active or not.
    pub fn delegation_of(&self, delegator: &AccountId) -> Option<&Delegation> {
        self.delegations.get(delegator)
    }

    pub fn delegated_away(&self, account: &AccountId) -> u128 {
        self.active(account).map_or(0, |d| d.amount)
    }

    pub fn delegated_in(&self, account: &AccountId) -> u128 {
        self.profiles.get(account).map_or(0, |p| p.total_delegated)
    }

    /// `own − delegated away + delegated in`.
    pub fn voting_power(&self, account: &AccountId, own_balance: u128) -> u128 {
        own_balance
            .saturating_sub(self.delegated_away(account))
            .saturating_add(self.delegated_in(account))
    }

    pub fn profile(&self, address: &AccountId) -> Option<&DelegateProfile> {
        self.profiles.get(address)
    }

    /// Registered delegates, most delegated first.
    pub fn list_delegates(&self) -> Vec<(&AccountId, &DelegateProfile)> {
        let mut listed: Vec<_> = self.profiles.iter().filter(|(_, p)| p.registered).collect();
        listed.sort_by(|a, b| b.1.total_delegated.cmp(&a.1.total_delegated).then(a.0.cmp(b.0)));
        listed
    }

    pub fn delegations(&self) -> impl Iterator<Item = (&AccountId, &Delegation)> {
        self.delegations.iter()
    }

    pub fn profiles(&self) -> impl Iterator<Item = (&AccountId, &DelegateProfile)> {
        self.profiles.iter()
    }

    /// Rebuild from persisted tables.
    pub fn restore(
        delegations: impl IntoIterator<Item = (AccountId, Delegation)>,
        profiles: impl IntoIterator<Item = (AccountId, DelegateProfile)>,
    ) -> Self {
        Self {
            delegations: delegations.into_iter().collect(),
            profiles: profiles.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(name: &str) -> AccountId {
        AccountId::new(name)
    }

    fn t(secs: u64) -> Timestamp {
        Timestamp::new(secs)
    }

    #[test]
    fn delegate_moves_power() {
        let mut registry = DelegationRegistry::new();
        let (d, rep) = (account("dora"), account("rep"));
        registry.delegate(&d, &rep, 300, 1000, t(0)).unwrap();

        assert_eq!(registry.voting_power(&d, 1000), 700);
        assert_eq!(registry.voting_power(&rep, 50), 350);
        let profile = registry.profile(&rep).unwrap();
        assert_eq!(profile.total_delegated, 300);
        assert_eq!(profile.delegator_count, 1);
        assert!(!profile.registered);
    }

    #[test]
    fn redelegate_replaces_without_double_counting() {
        let mut registry = DelegationRegistry::new();
        let (d, a, b) = (account("dora"), account("a"), account("b"));
        registry.delegate(&d, &a, 300, 1000, t(0)).unwrap();
        registry.delegate(&d, &b, 1000, 1000, t(5)).unwrap();

        assert_eq!(registry.delegated_in(&a), 0);
        assert_eq!(registry.profile(&a).unwrap().delegator_count, 0);
        assert_eq!(registry.delegated_in(&b), 1000);
        assert_eq!(registry.voting_power(&d, 1000), 0);
        assert_eq!(registry.active(&d).unwrap().timestamp, t(5));
    }

    #[test]
    fn redelegate_to_same_delegate_adjusts_amount() {
        let mut registry = DelegationRegistry::new();
        let (d, a) = (account("dora"), account("a"));
        registry.delegate(&d, &a, 300, 1000, t(0)).unwrap();
        registry.delegate(&d, &a, 100, 1000, t(1)).unwrap();
        let profile = registry.profile(&a).unwrap();
        assert_eq!(profile.total_delegated, 100);
        assert_eq!(profile.delegator_count, 1);
    }

    #[test]
    fn delegate_rejects_invalid_requests() {
        let mut registry = DelegationRegistry::new();
        let (d, a) = (account("dora"), account("a"));
        assert_eq!(
            registry.delegate(&d, &d, 1, 10, t(0)),
            Err(GovernanceError::SelfDelegation)
        );
        assert_eq!(
            registry.delegate(&d, &a, 0, 10, t(0)),
            Err(GovernanceError::ZeroAmount)
        );
        assert_eq!(
            registry.delegate(&d, &a, 11, 10, t(0)),
            Err(GovernanceError::InsufficientBalance {
                needed: 11,
                available: 10
            })
        );
        assert!(registry.active(&d).is_none());
        assert!(registry.profile(&a).is_none());
    }

    #[test]
    fn undelegate_restores_power_and_keeps_history() {
        let mut registry = DelegationRegistry::new();
        let (d, a) = (account("dora"), account("a"));
        registry.delegate(&d, &a, 400, 1000, t(0)).unwrap();
        let cleared = registry.undelegate(&d, t(9)).unwrap();

        assert_eq!(cleared.amount, 400);
        assert!(!cleared.active);
        assert_eq!(registry.voting_power(&d, 1000), 1000);
        assert_eq!(registry.delegated_in(&a), 0);
        assert!(registry.delegation_of(&d).is_some());
        assert_eq!(
            registry.undelegate(&d, t(10)),
            Err(GovernanceError::NoActiveDelegation(d.clone()))
        );
    }

    #[test]
    fn register_is_an_idempotent_upsert() {
        let mut registry = DelegationRegistry::new();
        let rep = account("rep");
        registry.delegate(&account("x"), &rep, 10, 10, t(0)).unwrap();
        registry
            .register_delegate(&rep, "Rep", "first", t(100))
            .unwrap();
        let profile = registry
            .register_delegate(&rep, "Rep v2", "second", t(200))
            .unwrap();

        assert_eq!(profile.name, "Rep v2");
        assert_eq!(profile.registration_time, Some(t(100)));
        assert_eq!(profile.total_delegated, 10);
        assert!(registry
            .register_delegate(&rep, "  ", "", t(300))
            .is_err());
    }

    #[test]
    fn only_registered_delegates_are_listed() {
        let mut registry = DelegationRegistry::new();
        let (a, b, c) = (account("a"), account("b"), account("c"));
        registry.delegate(&account("x"), &a, 10, 10, t(0)).unwrap();
        registry.delegate(&account("y"), &b, 50, 50, t(0)).unwrap();
        registry.register_delegate(&a, "A", "", t(0)).unwrap();
        registry.register_delegate(&b, "B", "", t(0)).unwrap();
        registry.register_delegate(&c, "C", "", t(0)).unwrap();
        registry.delegate(&account("z"), &account("hidden"), 99, 99, t(0)).unwrap();

        let listed: Vec<_> = registry.list_delegates().into_iter().map(|(a, _)| a.as_str()).collect();
        assert_eq!(listed, vec!["b", "a", "c"]);
    }
}
