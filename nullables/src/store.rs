//! Nullable store — thread-safe in-memory table storage for testing.

use agora_store::{BatchOp, LedgerStore, StoreError, Table, WriteBatch};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

type Tables = BTreeMap<Table, BTreeMap<Vec<u8>, Vec<u8>>>;

/// An in-memory [`LedgerStore`]. Batches apply atomically under one lock.
#[derive(Debug, Default)]
pub struct NullStore {
    tables: Mutex<Tables>,
    commits: AtomicUsize,
    last_batch_ops: AtomicUsize,
    fail_commits: AtomicBool,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent commit fail (or succeed again).
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Number of successful commits so far.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Operation count of the last successful batch.
    pub fn last_batch_ops(&self) -> usize {
        self.last_batch_ops.load(Ordering::SeqCst)
    }

    pub fn len(&self, table: Table) -> Result<usize, StoreError> {
        Ok(self.lock()?.get(&table).map_or(0, BTreeMap::len))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend("null store lock poisoned".into()))
    }
}

impl LedgerStore for NullStore {
    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected commit failure".into()));
        }
        let mut tables = self.lock()?;
        let mut staged = tables.clone();
        let ops = batch.len();
        for op in batch.into_ops() {
            match op {
                BatchOp::Put { table, key, value } => {
                    staged.entry(table).or_default().insert(key, value);
                }
                BatchOp::Delete { table, key } => {
                    if let Some(t) = staged.get_mut(&table) {
                        t.remove(&key);
                    }
                }
                BatchOp::Clear(table) => {
                    staged.remove(&table);
                }
            }
        }
        *tables = staged;
        self.commits.fetch_add(1, Ordering::SeqCst);
        self.last_batch_ops.store(ops, Ordering::SeqCst);
        Ok(())
    }

    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.lock()?.get(&table).and_then(|t| t.get(key)).cloned())
    }

    fn iter(&self, table: Table) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        Ok(self
            .lock()?
            .get(&table)
            .map(|t| t.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }
}
