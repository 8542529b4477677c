//! Agora node: runs the ledger as a serial service.
//!
//! Commands are submitted asynchronously and confirmed once committed and
//! persisted; reads see only confirmed state.

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod service;
pub mod shutdown;

pub use config::NodeConfig;
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
pub use node::AgoraNode;
pub use service::{LedgerService, ServiceConfig, Submission};
pub use shutdown::{ShutdownController, ShutdownSignal};
