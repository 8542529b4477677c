//! Prometheus metrics for the Agora node.
//!
//! [`NodeMetrics`] owns a dedicated [`Registry`]; [`NodeMetrics::encode`]
//! renders it in the Prometheus text exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, Histogram,
    HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

use crate::NodeError;

pub struct NodeMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Commands committed and confirmed, by command name.
    pub commands_committed: IntCounterVec,
    /// Commands rejected by the ledger, by error category.
    pub commands_rejected: IntCounterVec,
    /// Committed states that could not be written to storage.
    pub persistence_failures: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    pub proposal_count: IntGauge,
    pub ledger_sequence: IntGauge,
    /// Commands submitted but not yet processed.
    pub queue_depth: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Time to apply and persist one command, in milliseconds.
    pub apply_time_ms: Histogram,
}

impl NodeMetrics {
    pub fn new() -> Result<Self, NodeError> {
        let registry = Registry::new();

        let commands_committed = register_int_counter_vec_with_registry!(
            Opts::new("agora_commands_committed_total", "Commands committed to the ledger"),
            &["command"],
            registry
        )?;
        let commands_rejected = register_int_counter_vec_with_registry!(
            Opts::new("agora_commands_rejected_total", "Commands rejected by the ledger"),
            &["kind"],
            registry
        )?;
        let persistence_failures = register_int_counter_with_registry!(
            Opts::new(
                "agora_persistence_failures_total",
                "Committed states that failed to persist"
            ),
            registry
        )?;

        let proposal_count = register_int_gauge_with_registry!(
            Opts::new("agora_proposal_count", "Number of proposals in the ledger"),
            registry
        )?;
        let ledger_sequence = register_int_gauge_with_registry!(
            Opts::new("agora_ledger_sequence", "Sequence number of the last committed command"),
            registry
        )?;
        let queue_depth = register_int_gauge_with_registry!(
            Opts::new("agora_queue_depth", "Submitted commands awaiting processing"),
            registry
        )?;

        // Exponential buckets covering 0.1 ms → ~1.6 s.
        let apply_time_ms = register_histogram_with_registry!(
            HistogramOpts::new("agora_apply_time_ms", "Command apply and persist time in milliseconds")
                .buckets(prometheus::exponential_buckets(0.1, 2.0, 15)?),
            registry
        )?;

        Ok(Self {
            registry,
            commands_committed,
            commands_rejected,
            persistence_failures,
            proposal_count,
            ledger_sequence,
            queue_depth,
            apply_time_ms,
        })
    }

    /// Render every metric in the text exposition format.
    pub fn encode(&self) -> Result<String, NodeError> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| NodeError::Config(format!("metrics are not UTF-8: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_text_output() {
        let metrics = NodeMetrics::new().unwrap();
        metrics.commands_committed.with_label_values(&["vote"]).inc();
        metrics.commands_rejected.with_label_values(&["state"]).inc_by(2);
        metrics.proposal_count.set(3);

        let text = metrics.encode().unwrap();
        assert!(text.contains("agora_commands_committed_total{command=\"vote\"} 1"));
        assert!(text.contains("agora_commands_rejected_total{kind=\"state\"} 2"));
        assert!(text.contains("agora_proposal_count 3"));
    }

    #[test]
    fn registries_are_independent() {
        let a = NodeMetrics::new().unwrap();
        let b = NodeMetrics::new().unwrap();
        a.ledger_sequence.set(5);
        assert_eq!(b.ledger_sequence.get(), 0);
    }
}
