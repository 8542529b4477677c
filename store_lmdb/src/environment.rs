//! LMDB environment setup and the [`LedgerStore`] implementation.

use std::path::{Path, PathBuf};

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use agora_store::{BatchOp, LedgerStore, StoreError, Table, WriteBatch};

use crate::LmdbError;

/// Wraps the LMDB environment and one database handle per [`Table`].
pub struct LmdbEnvironment {
    env: Env,
    dbs: Vec<Database<Bytes, Bytes>>,
    path: PathBuf,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at `path`, creating every table.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;
        // SAFETY: the environment is opened once per process for this path and
        // the file is not modified by anything other than LMDB.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(Table::COUNT as u32)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let mut dbs = Vec::with_capacity(Table::COUNT);
        for table in Table::ALL {
            dbs.push(env.create_database::<Bytes, Bytes>(&mut wtxn, Some(table.name()))?);
        }
        wtxn.commit()?;

        tracing::info!(path = %path.display(), map_size, "opened LMDB environment");
        Ok(Self {
            env,
            dbs,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    fn db(&self, table: Table) -> Database<Bytes, Bytes> {
        self.dbs[table.index()]
    }

    /// Number of entries in `table`.
    pub fn len(&self, table: Table) -> Result<u64, LmdbError> {
        let rtxn = self.env.read_txn()?;
        Ok(self.db(table).len(&rtxn)?)
    }

    /// Flush OS buffers to disk.
    pub fn sync(&self) -> Result<(), LmdbError> {
        self.env.force_sync()?;
        Ok(())
    }
}

impl LedgerStore for LmdbEnvironment {
    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let ops = batch.len();
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        for op in batch.into_ops() {
            match op {
                BatchOp::Put { table, key, value } => {
                    self.db(table)
                        .put(&mut wtxn, &key, &value)
                        .map_err(LmdbError::from)?;
                }
                BatchOp::Delete { table, key } => {
                    self.db(table)
                        .delete(&mut wtxn, &key)
                        .map_err(LmdbError::from)?;
                }
                BatchOp::Clear(table) => {
                    self.db(table).clear(&mut wtxn).map_err(LmdbError::from)?;
                }
            }
        }
        // Dropping the transaction on an early return aborts it.
        wtxn.commit().map_err(LmdbError::from)?;
        tracing::debug!(ops, "write batch committed");
        Ok(())
    }

    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let value = self
            .db(table)
            .get(&rtxn, key)
            .map_err(LmdbError::from)?
            .map(<[u8]>::to_vec);
        Ok(value)
    }

    fn iter(&self, table: Table) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut out = Vec::new();
        for item in self.db(table).iter(&rtxn).map_err(LmdbError::from)? {
            let (k, v) = item.map_err(LmdbError::from)?;
            out.push((k.to_vec(), v.to_vec()));
        }
        Ok(out)
    }

    fn prefix_iter(&self, table: Table, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut out = Vec::new();
        for item in self
            .db(table)
            .prefix_iter(&rtxn, prefix)
            .map_err(LmdbError::from)?
        {
            let (k, v) = item.map_err(LmdbError::from)?;
            out.push((k.to_vec(), v.to_vec()));
        }
        Ok(out)
    }
}
