//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use strata_types::AccountId;

use crate::NodeError;

/// File name of the persisted peer registry inside the workspace.
pub const PEERS_FILE: &str = "peers";

/// Configuration for a Strata miner node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Workspace directory holding the peer file and job scratch space.
    #[serde(default = "default_workspace")]
    pub workspace: PathBuf,

    /// This miner's signing account. Required to run the orchestrator.
    #[serde(default)]
    pub account: Option<AccountId>,

    /// Bootstrap peer addresses reconnected to on the maintenance tick.
    #[serde(default)]
    pub bootstrap_peers: Vec<String>,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Period of the challenge tick.
    #[serde(default = "default_challenge_tick_secs")]
    pub challenge_tick_secs: u64,

    /// Period of the status tick (status sync, file report, tag, replace).
    #[serde(default = "default_status_tick_secs")]
    pub status_tick_secs: u64,

    /// Period of the maintenance tick (bootstrap reconnect, resize).
    #[serde(default = "default_maintenance_tick_secs")]
    pub maintenance_tick_secs: u64,

    /// Chain block interval; the key-fetch retry delay.
    #[serde(default = "default_block_interval_secs")]
    pub block_interval_secs: u64,

    /// Delay before a continuous job is relaunched after it exits.
    #[serde(default = "default_block_interval_secs")]
    pub restart_delay_secs: u64,

    /// How often discovery rebuilds the verifier registry from chain.
    #[serde(default = "default_discovery_refresh_secs")]
    pub discovery_refresh_secs: u64,

    /// How often discovery prunes and persists the peer registry.
    #[serde(default = "default_peer_persist_secs")]
    pub peer_persist_secs: u64,

    /// Blocks that must pass after exit before staking can be withdrawn.
    #[serde(default = "default_withdraw_cooldown_blocks")]
    pub withdraw_cooldown_blocks: u32,

    /// How long `stop` waits for the orchestrator to wind down.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_workspace() -> PathBuf {
    PathBuf::from("./strata_workspace")
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_challenge_tick_secs() -> u64 {
    18
}

fn default_status_tick_secs() -> u64 {
    60
}

fn default_maintenance_tick_secs() -> u64 {
    3600
}

fn default_block_interval_secs() -> u64 {
    6
}

fn default_discovery_refresh_secs() -> u64 {
    60
}

fn default_peer_persist_secs() -> u64 {
    600
}

fn default_withdraw_cooldown_blocks() -> u32 {
    57_600
}

fn default_shutdown_timeout_secs() -> u64 {
    5
}

/// Timing knobs for the orchestrator and the jobs it owns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Schedule {
    pub challenge_tick: Duration,
    pub status_tick: Duration,
    pub maintenance_tick: Duration,
    pub block_interval: Duration,
    pub restart_delay: Duration,
    pub discovery_refresh: Duration,
    pub peer_persist: Duration,
}

impl Default for Schedule {
    fn default() -> Self {
        NodeConfig::default().schedule()
    }
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        let config: Self = toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("NodeConfig is always serializable to TOML")
    }

    /// Reject periods that would make a timer spin.
    pub fn validate(&self) -> Result<(), NodeError> {
        let periods = [
            ("challenge_tick_secs", self.challenge_tick_secs),
            ("status_tick_secs", self.status_tick_secs),
            ("maintenance_tick_secs", self.maintenance_tick_secs),
            ("block_interval_secs", self.block_interval_secs),
            ("restart_delay_secs", self.restart_delay_secs),
            ("discovery_refresh_secs", self.discovery_refresh_secs),
            ("peer_persist_secs", self.peer_persist_secs),
        ];
        for (name, value) in periods {
            if value == 0 {
                return Err(NodeError::Config(format!("{name} must be greater than zero")));
            }
        }
        Ok(())
    }

    /// The account this node proves for, or a config error if unset.
    pub fn account_id(&self) -> Result<AccountId, NodeError> {
        self.account
            .ok_or_else(|| NodeError::Config("account is not configured".to_string()))
    }

    /// Location of the persisted peer registry.
    pub fn peers_path(&self) -> PathBuf {
        self.workspace.join(PEERS_FILE)
    }

    pub fn schedule(&self) -> Schedule {
        Schedule {
            challenge_tick: Duration::from_secs(self.challenge_tick_secs),
            status_tick: Duration::from_secs(self.status_tick_secs),
            maintenance_tick: Duration::from_secs(self.maintenance_tick_secs),
            block_interval: Duration::from_secs(self.block_interval_secs),
            restart_delay: Duration::from_secs(self.restart_delay_secs),
            discovery_refresh: Duration::from_secs(self.discovery_refresh_secs),
            peer_persist: Duration::from_secs(self.peer_persist_secs),
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            workspace: default_workspace(),
            account: None,
            bootstrap_peers: Vec::new(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            challenge_tick_secs: default_challenge_tick_secs(),
            status_tick_secs: default_status_tick_secs(),
            maintenance_tick_secs: default_maintenance_tick_secs(),
            block_interval_secs: default_block_interval_secs(),
            restart_delay_secs: default_block_interval_secs(),
            discovery_refresh_secs: default_discovery_refresh_secs(),
            peer_persist_secs: default_peer_persist_secs(),
            withdraw_cooldown_blocks: default_withdraw_cooldown_blocks(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = NodeConfig {
            account: Some(AccountId::new([7; 32])),
            ..NodeConfig::default()
        };
        let toml_str = config.to_toml_string();
        let parsed = NodeConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.challenge_tick_secs, config.challenge_tick_secs);
        assert_eq!(parsed.account, config.account);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = NodeConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.challenge_tick_secs, 18);
        assert_eq!(config.status_tick_secs, 60);
        assert_eq!(config.maintenance_tick_secs, 3600);
        assert_eq!(config.log_format, "human");
        assert!(config.account.is_none());
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            challenge_tick_secs = 9
            workspace = "/var/lib/strata"
        "#;
        let config = NodeConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.challenge_tick_secs, 9);
        assert_eq!(config.peers_path(), PathBuf::from("/var/lib/strata/peers"));
        assert_eq!(config.block_interval_secs, 6); // default
    }

    #[test]
    fn zero_period_is_rejected() {
        let err = NodeConfig::from_toml_str("status_tick_secs = 0").unwrap_err();
        assert!(matches!(err, NodeError::Config(_)));
    }

    #[test]
    fn missing_account_is_a_config_error() {
        let err = NodeConfig::default().account_id().unwrap_err();
        assert!(matches!(err, NodeError::Config(_)));
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = NodeConfig::from_toml_file("/nonexistent/strata.toml");
        assert!(matches!(result, Err(NodeError::Config(_))));
    }

    #[test]
    fn schedule_converts_seconds() {
        let schedule = NodeConfig::default().schedule();
        assert_eq!(schedule.challenge_tick, Duration::from_secs(18));
        assert_eq!(schedule.restart_delay, Duration::from_secs(6));
    }
}
