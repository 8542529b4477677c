//! Node configuration with TOML file support.

use std::path::{Path, PathBuf};

use agora_ledger::GenesisConfig;
use serde::{Deserialize, Serialize};

use crate::logging::LogFormat;
use crate::NodeError;

/// Configuration for an Agora node.
///
/// Loaded from a TOML file via [`NodeConfig::from_toml_file`] or built
/// programmatically (e.g. for tests). Every field has a default, so an empty
/// file is a valid configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Directory holding the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Delay between a command being committed and its confirmation.
    #[serde(default = "default_confirmation_delay_ms")]
    pub confirmation_delay_ms: u64,

    /// Maximum number of submitted, unprocessed commands.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// LMDB map size in MiB.
    #[serde(default = "default_map_size_mb")]
    pub map_size_mb: usize,

    /// Used only when the data directory holds no ledger yet.
    #[serde(default)]
    pub genesis: GenesisConfig,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./agora_data")
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_confirmation_delay_ms() -> u64 {
    0
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_map_size_mb() -> usize {
    1024
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        let config: Self = toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), NodeError> {
        self.log_format()?;
        if self.queue_capacity == 0 {
            return Err(NodeError::Config("queue_capacity must be greater than zero".into()));
        }
        if self.map_size_mb == 0 {
            return Err(NodeError::Config("map_size_mb must be greater than zero".into()));
        }
        self.genesis
            .validate()
            .map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn log_format(&self) -> Result<LogFormat, NodeError> {
        self.log_format.parse()
    }

    pub fn map_size_bytes(&self) -> usize {
        self.map_size_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            confirmation_delay_ms: default_confirmation_delay_ms(),
            queue_capacity: default_queue_capacity(),
            map_size_mb: default_map_size_mb(),
            genesis: GenesisConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_ledger::Allocation;
    use agora_types::AccountId;

    #[test]
    fn default_config_round_trips_through_toml() {
        let mut config = NodeConfig::default();
        config.genesis.admin = Some(AccountId::new("admin"));
        config.genesis.allocations.push(Allocation {
            account: AccountId::new("alice"),
            amount: 1000,
        });
        let toml_str = config.to_toml_string().expect("serializable");
        let parsed = NodeConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = NodeConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.queue_capacity, 1024);
        assert_eq!(config.log_format, "human");
        assert_eq!(config.genesis.params.quorum_bps, 2000);
    }

    #[test]
    fn genesis_block_overrides() {
        let toml = r#"
            confirmation_delay_ms = 250

            [genesis]
            admin = "treasury"

            [genesis.params]
            voting_period_secs = 600

            [[genesis.allocations]]
            account = "alice"
            amount = 600

            [[genesis.allocations]]
            account = "bob"
            amount = 400
        "#;
        let config = NodeConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.confirmation_delay_ms, 250);
        assert_eq!(config.genesis.admin, Some(AccountId::new("treasury")));
        assert_eq!(config.genesis.allocations.len(), 2);
        assert_eq!(config.genesis.params.voting_period_secs, 600);
        // Unspecified params keep their defaults.
        assert_eq!(config.genesis.params.majority_bps, 5000);
    }

    #[test]
    fn invalid_values_are_config_errors() {
        assert!(matches!(
            NodeConfig::from_toml_str("log_format = \"xml\""),
            Err(NodeError::Config(_))
        ));
        assert!(matches!(
            NodeConfig::from_toml_str("queue_capacity = 0"),
            Err(NodeError::Config(_))
        ));
        assert!(matches!(
            NodeConfig::from_toml_str("[genesis.params]\nquorum_bps = 20000"),
            Err(NodeError::Config(_))
        ));
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = NodeConfig::from_toml_file(Path::new("/nonexistent/agora.toml"));
        assert!(matches!(result, Err(NodeError::Config(_))));
    }
}
