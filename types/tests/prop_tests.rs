use proptest::prelude::*;

use agora_types::{apply_bps, AccountId, ProposalId, Timestamp, BPS_DENOMINATOR};

proptest! {
    /// ProposalId big-endian key roundtrip preserves the id.
    #[test]
    fn proposal_id_key_roundtrip(id in any::<u64>()) {
        let pid = ProposalId::new(id);
        prop_assert_eq!(ProposalId::from_be_bytes(pid.to_be_bytes()), pid);
    }

    /// Big-endian keys sort in the same order as the ids themselves.
    #[test]
    fn proposal_id_keys_sort_by_id(a in any::<u64>(), b in any::<u64>()) {
        let ka = ProposalId::new(a).to_be_bytes();
        let kb = ProposalId::new(b).to_be_bytes();
        prop_assert_eq!(ka.cmp(&kb), a.cmp(&b));
    }

    /// Timestamp ordering: new(a) <= new(b) iff a <= b.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ta = Timestamp::new(a);
        let tb = Timestamp::new(b);
        prop_assert_eq!(ta <= tb, a <= b);
        prop_assert_eq!(ta == tb, a == b);
    }

    /// Timestamp elapsed_since: elapsed_since(now) = now - self (saturating).
    #[test]
    fn timestamp_elapsed_since(base in 0u64..1_000_000, offset in 0u64..1_000_000) {
        let t = Timestamp::new(base);
        let now = Timestamp::new(base + offset);
        prop_assert_eq!(t.elapsed_since(now), offset);
    }

    /// Timestamp has_expired agrees with manual arithmetic.
    #[test]
    fn timestamp_has_expired_correct(
        start in 0u64..500_000,
        duration in 1u64..500_000,
        offset in 0u64..1_000_000,
    ) {
        let t = Timestamp::new(start);
        let now = Timestamp::new(start.saturating_add(offset));
        prop_assert_eq!(t.has_expired(duration, now), offset >= duration);
    }

    /// Timestamp bincode serialization roundtrip.
    #[test]
    fn timestamp_bincode_roundtrip(secs in any::<u64>()) {
        let ts = Timestamp::new(secs);
        let encoded = bincode::serialize(&ts).unwrap();
        let decoded: Timestamp = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, ts);
    }

    /// apply_bps never yields more than the input amount for bps <= 10000.
    #[test]
    fn apply_bps_bounded(amount in 0u128..u128::MAX / 10_000, bps in 0u32..=BPS_DENOMINATOR) {
        let scaled = apply_bps(amount, bps).unwrap();
        prop_assert!(scaled <= amount);
    }

    /// Account ids built from the allowed alphabet always parse.
    #[test]
    fn account_id_parse_accepts_alphabet(raw in "[a-zA-Z0-9_.-]{1,64}") {
        let id = AccountId::parse(&raw).unwrap();
        prop_assert_eq!(id.as_str(), raw.as_str());
    }
}
