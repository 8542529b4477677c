//! Database schema migration engine.
//!
//! Tracks a monotonically increasing schema version in the meta table and
//! runs sequential migration steps to bring an older database up to date.

use agora_store::{LedgerStore, CURRENT_SCHEMA_VERSION};

use crate::LmdbError;

pub struct Migrator;

impl Migrator {
    /// Check the stored schema version and run any needed migrations.
    ///
    /// - Version 0 means a fresh database (no version stored yet).
    /// - A stored version newer than [`CURRENT_SCHEMA_VERSION`] was written by
    ///   a newer node and is refused.
    pub fn run(store: &impl LedgerStore) -> Result<(), LmdbError> {
        let current = store
            .schema_version()
            .map_err(|e| LmdbError::Schema(e.to_string()))?;

        if current == CURRENT_SCHEMA_VERSION {
            tracing::info!(version = current, "database schema is up to date");
            return Ok(());
        }
        if current > CURRENT_SCHEMA_VERSION {
            return Err(LmdbError::Schema(format!(
                "database schema version {current} is newer than supported version {CURRENT_SCHEMA_VERSION}"
            )));
        }

        for version in current..CURRENT_SCHEMA_VERSION {
            tracing::info!(from = version, to = version + 1, "running migration");
            run_migration(version, version + 1)?;
        }
        store
            .set_schema_version(CURRENT_SCHEMA_VERSION)
            .map_err(|e| LmdbError::Schema(e.to_string()))?;
        tracing::info!(version = CURRENT_SCHEMA_VERSION, "migration complete");
        Ok(())
    }
}

fn run_migration(from: u32, to: u32) -> Result<(), LmdbError> {
    match (from, to) {
        // Initial schema, nothing to migrate from a blank slate.
        (0, 1) => Ok(()),
        _ => Err(LmdbError::Schema(format!("unknown migration: {from} -> {to}"))),
    }
}
