//! The serial ledger service.
//!
//! One tokio task owns the [`Ledger`] and drains a bounded command queue one
//! envelope at a time: apply, persist, wait out the confirmation delay, then
//! publish the new state to readers and answer the submitter. Until that
//! point a submitted command is invisible to reads.

use std::sync::Arc;
use std::time::{Duration, Instant};

use agora_ledger::{Envelope, Ledger, LedgerState, Receipt};
use agora_store::LedgerStore;
use agora_types::Clock;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;

use crate::metrics::NodeMetrics;
use crate::shutdown::{ShutdownController, ShutdownSignal};
use crate::NodeError;

/// Timeout for the service task to finish after shutdown is signalled.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServiceConfig {
    pub queue_capacity: usize,
    pub confirmation_delay: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            confirmation_delay: Duration::ZERO,
        }
    }
}

struct Request {
    envelope: Envelope,
    reply: oneshot::Sender<Result<Receipt, NodeError>>,
}

/// Handle to a submitted command. The command is accepted but not yet
/// confirmed; await [`confirmation`](Self::confirmation) for the outcome.
#[derive(Debug)]
pub struct Submission {
    command: &'static str,
    rx: oneshot::Receiver<Result<Receipt, NodeError>>,
}

impl Submission {
    pub fn command(&self) -> &'static str {
        self.command
    }

    /// Wait until the command is committed, persisted and visible to reads.
    pub async fn confirmation(self) -> Result<Receipt, NodeError> {
        self.rx.await.map_err(|_| NodeError::Stopped)?
    }
}

pub struct LedgerService {
    tx: mpsc::Sender<Request>,
    snapshot: Arc<RwLock<LedgerState>>,
    metrics: Arc<NodeMetrics>,
    shutdown: ShutdownController,
    handle: JoinHandle<()>,
}

impl LedgerService {
    /// Spawn the service task. Must be called from within a tokio runtime.
    pub fn spawn<S>(
        ledger: Ledger,
        store: Arc<S>,
        clock: Arc<dyn Clock>,
        config: ServiceConfig,
        metrics: Arc<NodeMetrics>,
    ) -> Self
    where
        S: LedgerStore + Send + Sync + 'static,
    {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let snapshot = Arc::new(RwLock::new(ledger.state().clone()));
        let shutdown = ShutdownController::new();
        metrics.ledger_sequence.set(gauge(ledger.state().sequence()));
        metrics
            .proposal_count
            .set(gauge(ledger.state().governance().proposals().len() as u64));

        let worker = Worker {
            ledger,
            store,
            clock,
            confirmation_delay: config.confirmation_delay,
            snapshot: Arc::clone(&snapshot),
            metrics: Arc::clone(&metrics),
        };
        let handle = tokio::spawn(worker.run(rx, shutdown.subscribe()));

        Self {
            tx,
            snapshot,
            metrics,
            shutdown,
            handle,
        }
    }

    /// Queue `envelope` for execution. Returns as soon as it is accepted.
    pub fn submit(&self, envelope: Envelope) -> Result<Submission, NodeError> {
        let command = envelope.command.name();
        let (reply, rx) = oneshot::channel();
        self.tx
            .try_send(Request { envelope, reply })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => NodeError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => NodeError::Stopped,
            })?;
        self.metrics.queue_depth.inc();
        tracing::debug!(command, "command submitted");
        Ok(Submission { command, rx })
    }

    /// Submit and wait for confirmation.
    pub async fn execute(&self, envelope: Envelope) -> Result<Receipt, NodeError> {
        self.submit(envelope)?.confirmation().await
    }

    /// Run `f` against the last confirmed state.
    pub async fn read<R>(&self, f: impl FnOnce(&LedgerState) -> R) -> R {
        let state = self.snapshot.read().await;
        f(&state)
    }

    pub fn metrics(&self) -> &Arc<NodeMetrics> {
        &self.metrics
    }

    /// Stop accepting commands, let the task finish the one in flight, and
    /// wait for it to exit.
    pub async fn shutdown(self) -> Result<(), NodeError> {
        self.shutdown.shutdown();
        drop(self.tx);
        match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.handle).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "ledger service task failed");
                Ok(())
            }
            Err(_) => Err(NodeError::ShutdownTimeout),
        }
    }
}

struct Worker<S> {
    ledger: Ledger,
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    confirmation_delay: Duration,
    snapshot: Arc<RwLock<LedgerState>>,
    metrics: Arc<NodeMetrics>,
}

impl<S: LedgerStore + Send + Sync + 'static> Worker<S> {
    async fn run(
        mut self,
        mut rx: mpsc::Receiver<Request>,
        mut stop: ShutdownSignal,
    ) {
        loop {
            let request = tokio::select! {
                biased;
                _ = stop.triggered() => {
                    tracing::info!("ledger service shutting down");
                    break;
                }
                request = rx.recv() => match request {
                    Some(request) => request,
                    None => break,
                },
            };
            self.metrics.queue_depth.dec();
            let result = self.process(&request.envelope).await;
            // The submitter may have stopped waiting.
            let _ = request.reply.send(result);
        }
    }

    async fn process(&mut self, envelope: &Envelope) -> Result<Receipt, NodeError> {
        let start = Instant::now();
        let now = self.clock.now();

        let mut candidate = self.ledger.clone();
        let receipt = match candidate.apply(envelope, now) {
            Ok(receipt) => receipt,
            Err(e) => {
                self.metrics
                    .commands_rejected
                    .with_label_values(&[e.kind().as_str()])
                    .inc();
                return Err(e.into());
            }
        };

        if let Err(e) = candidate.save_changes(self.ledger.state(), self.store.as_ref()) {
            self.metrics.persistence_failures.inc();
            tracing::warn!(
                sequence = receipt.sequence,
                command = envelope.command.name(),
                error = %e,
                "failed to persist committed state, command rolled back"
            );
            return Err(NodeError::Persistence(e.to_string()));
        }
        self.ledger = candidate;
        self.metrics
            .apply_time_ms
            .observe(start.elapsed().as_secs_f64() * 1000.0);

        if !self.confirmation_delay.is_zero() {
            tokio::time::sleep(self.confirmation_delay).await;
        }

        *self.snapshot.write().await = self.ledger.state().clone();
        self.metrics
            .commands_committed
            .with_label_values(&[envelope.command.name()])
            .inc();
        self.metrics.ledger_sequence.set(gauge(receipt.sequence));
        self.metrics
            .proposal_count
            .set(gauge(self.ledger.state().governance().proposals().len() as u64));
        tracing::info!(
            sequence = receipt.sequence,
            caller = %receipt.caller,
            command = %receipt.command,
            "command confirmed"
        );
        Ok(receipt)
    }
}

fn gauge(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
