use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Main configuration structure for the Lotus adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Inbound JSON-RPC gateway
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Result cache
    #[serde(default)]
    pub cache: CacheConfig,

    /// Upstream full node
    #[serde(default = "UpstreamConfig::default_node")]
    pub node: UpstreamConfig,

    /// Upstream storage-miner node
    #[serde(default = "UpstreamConfig::default_miner")]
    pub miner: UpstreamConfig,

    /// Chain constants
    #[serde(default)]
    pub chain: ChainConfig,

    /// Periodic snapshot push
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            cache: CacheConfig::default(),
            node: UpstreamConfig::default_node(),
            miner: UpstreamConfig::default_miner(),
            chain: ChainConfig::default(),
            monitor: MonitorConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Gateway listener and keystore location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GatewayConfig {
    /// Socket address to bind
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Directory holding the keystore and the generated admin token
    #[serde(default = "default_gateway_repo")]
    pub repo: PathBuf,

    /// Upper bound on a single RPC call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Answer CORS preflights from any origin
    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

fn default_listen() -> String {
    "0.0.0.0:9988".to_string()
}

fn default_gateway_repo() -> PathBuf {
    PathBuf::from("~/.lotusgw")
}

const fn default_request_timeout_secs() -> u64 {
    60
}

const fn default_true() -> bool {
    true
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            repo: default_gateway_repo(),
            request_timeout_secs: default_request_timeout_secs(),
            enable_cors: true,
        }
    }
}

/// Cache expiry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CacheConfig {
    /// TTL for ordinary reads
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,

    /// How often expired entries are purged
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// TTL for worker job snapshots, which change every few seconds
    #[serde(default = "default_worker_ttl_secs")]
    pub worker_ttl_secs: u64,
}

const fn default_ttl_secs() -> u64 {
    10
}

const fn default_sweep_interval_secs() -> u64 {
    60
}

const fn default_worker_ttl_secs() -> u64 {
    3
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: default_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            worker_ttl_secs: default_worker_ttl_secs(),
        }
    }
}

/// Connection settings for one upstream node.
///
/// Either `url` (plus optional `token`) is given, or `repo` points at the
/// node's repo directory and both are read from its `api` and `token` files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct UpstreamConfig {
    /// JSON-RPC endpoint, e.g. `http://127.0.0.1:1234/rpc/v0`
    #[serde(default)]
    pub url: String,

    /// API token sent as a bearer token
    #[serde(default)]
    pub token: Option<String>,

    /// Node repo to read `api` and `token` from when `url` is empty
    #[serde(default)]
    pub repo: Option<PathBuf>,

    /// Timeout for one upstream call
    #[serde(default = "default_upstream_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_upstream_timeout_secs() -> u64 {
    30
}

impl UpstreamConfig {
    /// Full node read from `~/.lotus`.
    pub fn default_node() -> Self {
        Self {
            repo: Some(PathBuf::from("~/.lotus")),
            timeout_secs: default_upstream_timeout_secs(),
            ..Self::default()
        }
    }

    /// Storage miner read from `~/.lotusminer`.
    pub fn default_miner() -> Self {
        Self {
            repo: Some(PathBuf::from("~/.lotusminer")),
            timeout_secs: default_upstream_timeout_secs(),
            ..Self::default()
        }
    }
}

/// Chain constants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChainConfig {
    /// Seconds per epoch
    #[serde(default = "default_block_delay_secs")]
    pub block_delay_secs: u64,
}

const fn default_block_delay_secs() -> u64 {
    30
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            block_delay_secs: default_block_delay_secs(),
        }
    }
}

/// Collector push settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MonitorConfig {
    /// Collector endpoint receiving the snapshot batch
    #[serde(default)]
    pub collector_url: String,

    /// Static headers sent with every push
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Seconds between push cycles
    #[serde(default = "default_push_interval_secs")]
    pub interval_secs: u64,

    /// Timeout for one collector request
    #[serde(default = "default_push_timeout_secs")]
    pub timeout_secs: u64,

    /// Tracked miner addresses. Empty means the miner node's own actor.
    #[serde(default)]
    pub miners: Vec<String>,

    /// Storage-miner nodes for tracked miners other than the one behind
    /// `miner`, keyed by miner address. Keys are tracked implicitly.
    #[serde(default)]
    pub miner_nodes: BTreeMap<String, UpstreamConfig>,

    /// Push once immediately instead of waiting a full interval
    #[serde(default)]
    pub run_on_startup: bool,
}

const fn default_push_interval_secs() -> u64 {
    60
}

const fn default_push_timeout_secs() -> u64 {
    30
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            collector_url: String::new(),
            headers: BTreeMap::new(),
            interval_secs: default_push_interval_secs(),
            timeout_secs: default_push_timeout_secs(),
            miners: Vec::new(),
            miner_nodes: BTreeMap::new(),
            run_on_startup: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files. Stdout only when unset.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// File rotation: daily, hourly, never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.gateway.listen, "0.0.0.0:9988");
        assert_eq!(config.cache.default_ttl_secs, 10);
        assert_eq!(config.cache.worker_ttl_secs, 3);
        assert_eq!(config.chain.block_delay_secs, 30);
        assert_eq!(config.monitor.interval_secs, 60);
        assert_eq!(config.monitor.timeout_secs, 30);
        assert!(config.monitor.miner_nodes.is_empty());
        assert!(config.miner.repo.is_some());
    }

    #[test]
    fn test_miner_nodes_yaml() {
        let yaml = r"
monitor:
  miners: [f01000]
  miner_nodes:
    f02000:
      url: http://10.0.0.2:2345/rpc/v0
      token: miner-two
";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let node = &config.monitor.miner_nodes["f02000"];
        assert_eq!(node.url, "http://10.0.0.2:2345/rpc/v0");
        assert_eq!(node.token.as_deref(), Some("miner-two"));
        assert_eq!(node.timeout_secs, 30);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config: Config = serde_yaml::from_str("cache:\n  default_ttl_secs: 5\n").unwrap();
        assert_eq!(config.cache.default_ttl_secs, 5);
        assert_eq!(config.cache.sweep_interval_secs, 60);
        assert_eq!(
            config.node.repo.as_deref(),
            Some(std::path::Path::new("~/.lotus"))
        );
    }
}
