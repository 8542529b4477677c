//! Logical tables of the ledger.

use std::fmt;

/// One keyed table. Each maps to its own database in a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Table {
    /// Big-endian proposal id → `Proposal`.
    Proposals,
    /// Proposal id ‖ account → `Vote`.
    Votes,
    /// Delegator account → `Delegation`.
    Delegations,
    /// Delegate account → `DelegateProfile`.
    DelegateProfiles,
    /// Proposal id → `TimelockEntry`.
    Timelock,
    /// Owner account → list of `EscrowPosition`.
    EscrowPositions,
    /// Owner account → `RewardAccount`.
    RewardAccounts,
    /// Account → liquid balance.
    Balances,
    /// Singleton records (settings, admin, rate history, schema version).
    Meta,
}

impl Table {
    pub const COUNT: usize = 9;

    pub const ALL: [Table; Self::COUNT] = [
        Self::Proposals,
        Self::Votes,
        Self::Delegations,
        Self::DelegateProfiles,
        Self::Timelock,
        Self::EscrowPositions,
        Self::RewardAccounts,
        Self::Balances,
        Self::Meta,
    ];

    /// Database name in the backend.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Proposals => "proposals",
            Self::Votes => "votes",
            Self::Delegations => "delegations",
            Self::DelegateProfiles => "delegate_profiles",
            Self::Timelock => "timelock",
            Self::EscrowPositions => "escrow_positions",
            Self::RewardAccounts => "reward_accounts",
            Self::Balances => "balances",
            Self::Meta => "meta",
        }
    }

    /// Position in [`Table::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexes_match_all_order() {
        for (i, table) in Table::ALL.iter().enumerate() {
            assert_eq!(table.index(), i);
        }
    }
}
