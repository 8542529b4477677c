//! Key encodings. Proposal ids are big-endian so LMDB's byte order matches
//! numeric order.

use crate::StoreError;
use agora_types::{AccountId, ProposalId};

pub fn proposal_key(id: ProposalId) -> [u8; 8] {
    id.to_be_bytes()
}

pub fn decode_proposal_key(key: &[u8]) -> Result<ProposalId, StoreError> {
    let bytes: [u8; 8] = key
        .get(..8)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| StoreError::Corruption(format!("proposal key of {} bytes", key.len())))?;
    Ok(ProposalId::from_be_bytes(bytes))
}

pub fn account_key(account: &AccountId) -> Vec<u8> {
    account.as_bytes().to_vec()
}

pub fn decode_account_key(key: &[u8]) -> Result<AccountId, StoreError> {
    std::str::from_utf8(key)
        .map(AccountId::new)
        .map_err(|e| StoreError::Corruption(format!("account key: {e}")))
}

/// Composite `(proposal id ‖ voter)` key; all votes of a proposal share the
/// 8-byte prefix.
pub fn vote_key(id: ProposalId, voter: &AccountId) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + voter.as_bytes().len());
    key.extend_from_slice(&id.to_be_bytes());
    key.extend_from_slice(voter.as_bytes());
    key
}

pub fn decode_vote_key(key: &[u8]) -> Result<(ProposalId, AccountId), StoreError> {
    let id = decode_proposal_key(key)?;
    let voter = decode_account_key(&key[8..])?;
    Ok((id, voter))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_key_roundtrip() {
        let voter = AccountId::new("bob");
        let key = vote_key(ProposalId::new(258), &voter);
        assert_eq!(&key[..8], &[0, 0, 0, 0, 0, 0, 1, 2]);
        assert_eq!(decode_vote_key(&key).unwrap(), (ProposalId::new(258), voter));
    }

    #[test]
    fn short_keys_are_corruption() {
        assert!(matches!(
            decode_proposal_key(&[1, 2, 3]),
            Err(StoreError::Corruption(_))
        ));
    }
}
