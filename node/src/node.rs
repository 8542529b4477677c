//! A running Agora node: LMDB-backed ledger behind the serial service.

use std::sync::Arc;
use std::time::Duration;

use agora_ledger::{Envelope, Ledger, LedgerState, Receipt};
use agora_store_lmdb::{LmdbEnvironment, Migrator};
use agora_types::Clock;

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::metrics::NodeMetrics;
use crate::service::{LedgerService, ServiceConfig, Submission};

pub struct AgoraNode {
    config: NodeConfig,
    service: LedgerService,
}

impl AgoraNode {
    /// Open (or create) the ledger under `config.data_dir` and start the
    /// ledger service. A fresh data directory is seeded from
    /// `config.genesis` at the clock's current time.
    pub async fn start(config: NodeConfig, clock: Arc<dyn Clock>) -> Result<Self, NodeError> {
        config.validate()?;
        let store = Arc::new(LmdbEnvironment::open(&config.data_dir, config.map_size_bytes())?);
        Migrator::run(store.as_ref())?;

        let ledger = match Ledger::load(store.as_ref())? {
            Some(ledger) => ledger,
            None => {
                let ledger = Ledger::from_genesis(&config.genesis, clock.now())?;
                ledger.save(store.as_ref())?;
                tracing::info!(data_dir = %config.data_dir.display(), "initialized new ledger");
                ledger
            }
        };
        tracing::info!(
            sequence = ledger.state().sequence(),
            data_dir = %config.data_dir.display(),
            "node started"
        );

        let metrics = Arc::new(NodeMetrics::new()?);
        let service = LedgerService::spawn(
            ledger,
            store,
            clock,
            ServiceConfig {
                queue_capacity: config.queue_capacity,
                confirmation_delay: Duration::from_millis(config.confirmation_delay_ms),
            },
            metrics,
        );
        Ok(Self { config, service })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn submit(&self, envelope: Envelope) -> Result<Submission, NodeError> {
        self.service.submit(envelope)
    }

    pub async fn execute(&self, envelope: Envelope) -> Result<Receipt, NodeError> {
        self.service.execute(envelope).await
    }

    pub async fn read<R>(&self, f: impl FnOnce(&LedgerState) -> R) -> R {
        self.service.read(f).await
    }

    pub fn metrics(&self) -> &Arc<NodeMetrics> {
        self.service.metrics()
    }

    pub async fn shutdown(self) -> Result<(), NodeError> {
        self.service.shutdown().await?;
        tracing::info!("node stopped");
        Ok(())
    }
}
