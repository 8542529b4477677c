//! Stop signal shared by the ledger service and the daemon.
//!
//! Backed by a `watch` channel so a subscriber created after shutdown was
//! triggered still observes it.

use tokio::signal;
use tokio::sync::watch;

#[derive(Clone)]
pub struct ShutdownController {
    tx: watch::Sender<bool>,
}

/// Receiving half handed to each task that must stop on shutdown.
#[derive(Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Resolves once shutdown is triggered, or immediately if it already was.
    pub async fn triggered(&mut self) {
        // A dropped controller also counts as shutdown.
        let _ = self.rx.wait_for(|stopped| *stopped).await;
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }

    /// Trigger shutdown on SIGINT or SIGTERM.
    pub async fn wait_for_signal(&self) {
        let interrupt = signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "SIGTERM handler unavailable");
                    std::future::pending::<()>().await;
                }
            }
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        let name = tokio::select! {
            _ = interrupt => "SIGINT",
            _ = terminate => "SIGTERM",
        };
        tracing::info!(signal = name, "stop requested");
        self.shutdown();
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}
