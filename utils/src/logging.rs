//! Structured logging initialization via `tracing`.

use tracing_subscriber::EnvFilter;

/// Install a compact subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive` (e.g. `"info"` or `"agora_ledger=debug"`).
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
