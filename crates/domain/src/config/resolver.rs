use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

use super::cache::CacheConfig;
use super::dnssec::DnssecConfig;
use super::errors::ConfigError;
use super::upstream::{parse_server_addr, RotationStrategy, TransportType};

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RetryBackoff {
    #[default]
    Exponential,

    Linear,

    Constant,
}

/// Resolver configuration, usually loaded from TOML.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
    #[serde(default = "default_servers")]
    pub servers: Vec<String>,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_retries")]
    pub retries: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    #[serde(default)]
    pub retry_backoff: RetryBackoff,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub dnssec: DnssecConfig,

    #[serde(default, rename = "type")]
    pub transport: TransportType,

    /// DNS-over-HTTPS endpoint, required when `type = "doh"`.
    #[serde(default)]
    pub server: Option<String>,

    #[serde(default)]
    pub rotation_strategy: RotationStrategy,

    #[serde(default)]
    pub health_check: bool,

    #[serde(default = "default_health_check_interval_ms")]
    pub health_check_interval_ms: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            servers: default_servers(),
            timeout_ms: default_timeout_ms(),
            retries: default_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            retry_backoff: RetryBackoff::default(),
            cache: CacheConfig::default(),
            dnssec: DnssecConfig::default(),
            transport: TransportType::default(),
            server: None,
            rotation_strategy: RotationStrategy::default(),
            health_check: false,
            health_check_interval_ms: default_health_check_interval_ms(),
        }
    }
}

impl ResolverConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.display().to_string(), e.to_string()))?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.servers.is_empty() {
            return Err(ConfigError::Validation(
                "At least one upstream server must be configured".into(),
            ));
        }
        self.server_addrs()?;

        if self.timeout_ms == 0 {
            return Err(ConfigError::Validation("timeout_ms must be greater than 0".into()));
        }

        if self.transport == TransportType::Doh
            && self.server.as_deref().map_or(true, |s| s.trim().is_empty())
        {
            return Err(ConfigError::Validation(
                "type = \"doh\" requires a `server` endpoint URL".into(),
            ));
        }

        if let (Some(min), Some(max)) = (self.cache.min_ttl, self.cache.max_ttl) {
            if min > max {
                return Err(ConfigError::Validation(format!(
                    "cache.min_ttl ({}) exceeds cache.max_ttl ({})",
                    min, max
                )));
            }
        }

        if self.cache.enabled && self.cache.max_size == 0 {
            return Err(ConfigError::Validation(
                "cache.max_size must be greater than 0 when the cache is enabled".into(),
            ));
        }

        Ok(())
    }

    pub fn server_addrs(&self) -> Result<Vec<SocketAddr>, ConfigError> {
        self.servers.iter().map(|s| parse_server_addr(s)).collect()
    }
}

fn default_servers() -> Vec<String> {
    vec!["8.8.8.8:53".to_string(), "1.1.1.1:53".to_string()]
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_retries() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    100
}

fn default_health_check_interval_ms() -> u64 {
    30_000
}
