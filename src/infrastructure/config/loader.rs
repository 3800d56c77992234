use std::path::Path;

use anyhow::{bail, Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;
use crate::domain::models::Address;

/// Default configuration file, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "lotus-adapter.yaml";

/// Prefix of environment overrides; nested keys are separated by `__`.
pub const ENV_PREFIX: &str = "LOTUS_ADAPTER_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Unknown `logging.level`.
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    /// Unknown `logging.format`.
    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    /// Unknown `logging.rotation`.
    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    /// `gateway.listen` is blank.
    #[error("Gateway listen address cannot be empty")]
    EmptyListenAddress,

    /// A duration or interval setting is zero.
    #[error("Invalid {0}: must be greater than zero")]
    ZeroDuration(&'static str),

    /// Pushing was requested without `monitor.collector_url`.
    #[error("Monitor collector_url is required to push snapshots")]
    MissingCollectorUrl,

    /// Any other invalid setting.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. lotus-adapter.yaml in the working directory (optional)
    /// 3. Environment variables (LOTUS_ADAPTER_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        Self::load_from(None)
    }

    /// Load configuration, reading `path` instead of the default file.
    ///
    /// An explicitly named file must exist.
    pub fn load_from(path: Option<&Path>) -> Result<Config> {
        let file = match path {
            Some(path) => {
                if !path.exists() {
                    bail!("config file {} does not exist", path.display());
                }
                path.to_path_buf()
            }
            None => DEFAULT_CONFIG_FILE.into(),
        };

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(&file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load configuration ({})", file.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.gateway.listen.trim().is_empty() {
            return Err(ConfigError::EmptyListenAddress);
        }

        let durations = [
            (
                "gateway.request_timeout_secs",
                config.gateway.request_timeout_secs,
            ),
            ("cache.default_ttl_secs", config.cache.default_ttl_secs),
            (
                "cache.sweep_interval_secs",
                config.cache.sweep_interval_secs,
            ),
            ("cache.worker_ttl_secs", config.cache.worker_ttl_secs),
            ("node.timeout_secs", config.node.timeout_secs),
            ("miner.timeout_secs", config.miner.timeout_secs),
            ("chain.block_delay_secs", config.chain.block_delay_secs),
            ("monitor.interval_secs", config.monitor.interval_secs),
            ("monitor.timeout_secs", config.monitor.timeout_secs),
        ];
        if let Some((name, _)) = durations.iter().find(|(_, secs)| *secs == 0) {
            return Err(ConfigError::ZeroDuration(*name));
        }

        for miner in &config.monitor.miners {
            if miner.parse::<Address>().is_err() {
                return Err(ConfigError::ValidationFailed(format!(
                    "monitor.miners contains invalid address {miner:?}"
                )));
            }
        }

        for (miner, upstream) in &config.monitor.miner_nodes {
            if miner.parse::<Address>().is_err() {
                return Err(ConfigError::ValidationFailed(format!(
                    "monitor.miner_nodes contains invalid address {miner:?}"
                )));
            }
            if upstream.timeout_secs == 0 {
                return Err(ConfigError::ZeroDuration(
                    "monitor.miner_nodes.timeout_secs",
                ));
            }
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(
                config.logging.rotation.clone(),
            ));
        }

        Ok(())
    }

    /// Checks that only matter when the push daemon is started.
    pub fn validate_monitor(config: &Config) -> Result<(), ConfigError> {
        if config.monitor.collector_url.trim().is_empty() {
            return Err(ConfigError::MissingCollectorUrl);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::config::UpstreamConfig;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
gateway:
  listen: 127.0.0.1:8899
cache:
  default_ttl_secs: 15
  worker_ttl_secs: 2
monitor:
  collector_url: http://collector.local/push
  headers:
    X-Api-Key: secret
  miners: [f01000, f02000]
logging:
  level: debug
  format: json
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.gateway.listen, "127.0.0.1:8899");
        assert_eq!(config.cache.default_ttl_secs, 15);
        assert_eq!(config.cache.worker_ttl_secs, 2);
        assert_eq!(config.monitor.headers["X-Api-Key"], "secret");
        assert_eq!(config.monitor.miners.len(), 2);
        assert_eq!(config.logging.format, "json");

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
        ConfigLoader::validate_monitor(&config).expect("collector configured");
    }

    #[test]
    fn test_load_from_file_with_env_override() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "cache:\n  default_ttl_secs: 20\n  sweep_interval_secs: 30"
        )
        .unwrap();

        temp_env::with_var("LOTUS_ADAPTER_CACHE__DEFAULT_TTL_SECS", Some("42"), || {
            let config = ConfigLoader::load_from(Some(file.path())).unwrap();
            assert_eq!(config.cache.default_ttl_secs, 42);
            assert_eq!(config.cache.sweep_interval_secs, 30);
        });
    }

    #[test]
    fn test_load_from_missing_file_fails() {
        let result = ConfigLoader::load_from(Some(Path::new("/nonexistent/lotus-adapter.yaml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_zero_ttl() {
        let mut config = Config::default();
        config.cache.default_ttl_secs = 0;

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::ZeroDuration("cache.default_ttl_secs")
        ));
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "invalid".to_string();

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidLogLevel(level) => assert_eq!(level, "invalid"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidLogFormat(_)
        ));
    }

    #[test]
    fn test_validate_bad_miner_address() {
        let mut config = Config::default();
        config.monitor.miners = vec!["miner-one".to_string()];

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::ValidationFailed(_)
        ));
    }

    #[test]
    fn test_validate_miner_nodes() {
        let mut config = Config::default();
        config
            .monitor
            .miner_nodes
            .insert("miner-two".to_string(), UpstreamConfig::default_miner());
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::ValidationFailed(_)
        ));

        config.monitor.miner_nodes.clear();
        config
            .monitor
            .miner_nodes
            .insert("f02000".to_string(), UpstreamConfig::default());
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::ZeroDuration("monitor.miner_nodes.timeout_secs")
        ));
    }

    #[test]
    fn test_validate_zero_push_timeout() {
        let mut config = Config::default();
        config.monitor.timeout_secs = 0;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::ZeroDuration("monitor.timeout_secs")
        ));
    }

    #[test]
    fn test_validate_empty_listen() {
        let mut config = Config::default();
        config.gateway.listen = " ".to_string();

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::EmptyListenAddress
        ));
    }

    #[test]
    fn test_monitor_requires_collector() {
        assert!(matches!(
            ConfigLoader::validate_monitor(&Config::default()).unwrap_err(),
            ConfigError::MissingCollectorUrl
        ));
    }
}
