use proptest::prelude::*;

use agora_escrow::{EscrowError, EscrowVault, LockTerms};
use agora_types::{AccountId, Timestamp};

const WEEK: u64 = 7 * 24 * 3600;
const TERMS: LockTerms = LockTerms {
    lock_secs: WEEK,
    slashing_risk_bps: 1000,
};

fn owner() -> AccountId {
    AccountId::new("owner")
}

fn admin() -> AccountId {
    AccountId::new("admin")
}

proptest! {
    /// Release pays exactly the original amount minus every slash.
    #[test]
    fn release_pays_original_minus_slashes(
        amount in 1u128..1_000_000_000,
        slashes in prop::collection::vec(1u32..=10_000, 0..4),
    ) {
        let mut vault = EscrowVault::new(0, Timestamp::new(0));
        let index = vault.escrow(&owner(), amount, amount, TERMS, Timestamp::new(0)).unwrap();
        let mut burned = 0u128;
        for (i, bps) in slashes.iter().enumerate() {
            let out = vault
                .slash(&admin(), Some(&admin()), &owner(), index, *bps, Timestamp::new(i as u64 + 1))
                .unwrap();
            burned += out.burned;
        }
        let paid = vault.release(&owner(), index, Timestamp::new(WEEK)).unwrap();
        prop_assert_eq!(paid + burned, amount);
    }

    /// Release before the lock expires always fails with a state error.
    #[test]
    fn release_before_lock_fails(amount in 1u128..1_000_000, at in 0u64..WEEK) {
        let mut vault = EscrowVault::new(0, Timestamp::new(0));
        let index = vault.escrow(&owner(), amount, amount, TERMS, Timestamp::new(0)).unwrap();
        let res = vault.release(&owner(), index, Timestamp::new(at));
        let still_locked = matches!(res, Err(EscrowError::StillLocked { .. }));
        prop_assert!(still_locked);
    }

    /// Pending rewards never decrease with time and stop growing at release time.
    #[test]
    fn rewards_monotonic_and_capped(
        amount in 1u128..1_000_000_000,
        rate in 1u64..100_000,
        t1 in 0u64..WEEK,
        extra in 0u64..WEEK,
    ) {
        let mut vault = EscrowVault::new(rate, Timestamp::new(0));
        vault.escrow(&owner(), amount, amount, TERMS, Timestamp::new(0)).unwrap();
        let r1 = vault.pending_rewards(&owner(), Timestamp::new(t1)).unwrap();
        let r2 = vault.pending_rewards(&owner(), Timestamp::new(t1 + extra)).unwrap();
        let cap = vault.pending_rewards(&owner(), Timestamp::new(WEEK)).unwrap();
        let after = vault.pending_rewards(&owner(), Timestamp::new(WEEK + extra)).unwrap();
        prop_assert!(r2 >= r1);
        prop_assert_eq!(cap, after);
    }

    /// Claiming at intermediate times pays exactly what a single accrual would.
    #[test]
    fn checkpoints_neither_inflate_nor_lose_rewards(
        amount in 1u128..1_000_000_000,
        rate in 1u64..100_000,
        cuts in prop::collection::vec(1u64..WEEK, 1..5),
    ) {
        let mut single = EscrowVault::new(rate, Timestamp::new(0));
        single.escrow(&owner(), amount, amount, TERMS, Timestamp::new(0)).unwrap();
        let expected = single.pending_rewards(&owner(), Timestamp::new(WEEK)).unwrap();

        let mut stepped = EscrowVault::new(rate, Timestamp::new(0));
        stepped.escrow(&owner(), amount, amount, TERMS, Timestamp::new(0)).unwrap();
        let mut cuts = cuts;
        cuts.sort_unstable();
        let mut claimed = 0u128;
        for cut in cuts {
            if let Ok(paid) = stepped.claim_rewards(&owner(), Timestamp::new(cut)) {
                claimed += paid;
            }
        }
        claimed += stepped.pending_rewards(&owner(), Timestamp::new(WEEK)).unwrap();
        prop_assert_eq!(claimed, expected);
    }
}
