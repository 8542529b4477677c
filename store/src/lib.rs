//! Abstract storage for the Agora ledger.
//!
//! The ledger persists as a set of keyed [`Table`]s. Backends (LMDB, or the
//! in-memory store used in tests) implement [`LedgerStore`]; the rest of the
//! codebase depends only on the trait.

pub mod batch;
pub mod error;
pub mod keys;
pub mod table;

pub use batch::{BatchOp, WriteBatch};
pub use error::StoreError;
pub use table::Table;

use serde::de::DeserializeOwned;

/// Meta-table key holding the schema version (`u32`, little-endian).
pub const SCHEMA_VERSION_KEY: &[u8] = b"schema_version";

/// The schema version that the current code writes.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// A transactional table store.
pub trait LedgerStore {
    /// Apply every operation in `batch` atomically.
    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;

    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// All entries of `table` in key order.
    fn iter(&self, table: Table) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError>;

    /// Entries whose key starts with `prefix`.
    fn prefix_iter(&self, table: Table, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        Ok(self
            .iter(table)?
            .into_iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .collect())
    }

    /// Decode a bincode value, if present.
    fn get_value<T: DeserializeOwned>(&self, table: Table, key: &[u8]) -> Result<Option<T>, StoreError>
    where
        Self: Sized,
    {
        self.get(table, key)?
            .map(|bytes| bincode::deserialize(&bytes).map_err(StoreError::from))
            .transpose()
    }

    /// Stored schema version; 0 for a fresh database.
    fn schema_version(&self) -> Result<u32, StoreError> {
        match self.get(Table::Meta, SCHEMA_VERSION_KEY)? {
            None => Ok(0),
            Some(bytes) => {
                let arr: [u8; 4] = bytes.as_slice().try_into().map_err(|_| {
                    StoreError::Corruption(format!("schema version has {} bytes", bytes.len()))
                })?;
                Ok(u32::from_le_bytes(arr))
            }
        }
    }

    fn set_schema_version(&self, version: u32) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch.put(Table::Meta, SCHEMA_VERSION_KEY, version.to_le_bytes());
        self.commit(batch)
    }
}

/// Decode every value of a table.
pub fn decode_all<T: DeserializeOwned>(
    entries: Vec<(Vec<u8>, Vec<u8>)>,
) -> Result<Vec<(Vec<u8>, T)>, StoreError> {
    entries
        .into_iter()
        .map(|(k, v)| Ok((k, bincode::deserialize(&v)?)))
        .collect()
}
