//! Account identifiers.

use crate::error::TypeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An account on the governance ledger.
///
/// Accounts are opaque keys issued by the external signer; the ledger only
/// requires them to be short, printable and stable. Key management lives
/// outside the core.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// Maximum length of an account id in bytes.
    pub const MAX_LEN: usize = 64;

    /// Create an account id from a raw string without validation.
    ///
    /// Prefer [`AccountId::parse`] for untrusted input.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Parse and validate an account id.
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        if raw.is_empty() {
            return Err(TypeError::EmptyAccount);
        }
        if raw.len() > Self::MAX_LEN {
            return Err(TypeError::AccountTooLong { max: Self::MAX_LEN });
        }
        if let Some(c) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
        {
            return Err(TypeError::InvalidAccountChar(c));
        }
        Ok(Self(raw.to_string()))
    }

    /// Return the raw account string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key bytes used by the storage layer.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccountId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_plain_names() {
        let id = AccountId::parse("alice_01").unwrap();
        assert_eq!(id.as_str(), "alice_01");
    }

    #[test]
    fn parse_rejects_empty_and_long() {
        assert_eq!(AccountId::parse(""), Err(TypeError::EmptyAccount));
        let long = "a".repeat(AccountId::MAX_LEN + 1);
        assert_eq!(
            AccountId::parse(&long),
            Err(TypeError::AccountTooLong { max: AccountId::MAX_LEN })
        );
    }

    #[test]
    fn parse_rejects_whitespace() {
        assert_eq!(
            AccountId::parse("bad name"),
            Err(TypeError::InvalidAccountChar(' '))
        );
    }
}
