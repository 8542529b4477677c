use agora_types::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("ledger error: {0}")]
    Ledger(#[from] agora_ledger::LedgerError),

    #[error("store error: {0}")]
    Store(#[from] agora_store::StoreError),

    #[error("LMDB error: {0}")]
    Lmdb(#[from] agora_store_lmdb::LmdbError),

    #[error("failed to persist committed state: {0}")]
    Persistence(String),

    #[error("command queue is full")]
    QueueFull,

    #[error("ledger service has stopped")]
    Stopped,

    #[error("config error: {0}")]
    Config(String),

    #[error("logging error: {0}")]
    Logging(String),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("shutdown timeout")]
    ShutdownTimeout,
}

impl NodeError {
    /// Category of a ledger rejection; `None` for node-level failures.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Ledger(e) => Some(e.kind()),
            _ => None,
        }
    }

    /// Whether resubmitting the same command may succeed. Ledger rejections
    /// never do.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::QueueFull | Self::Stopped | Self::Persistence(_))
    }
}
