//! LMDB storage backend for the Agora ledger.
//!
//! Implements [`agora_store::LedgerStore`] with the `heed` LMDB bindings.
//! Each logical table maps to one named database within a single environment,
//! and a [`agora_store::WriteBatch`] commits in one LMDB write transaction.

pub mod environment;
pub mod error;
pub mod migration;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use migration::Migrator;
