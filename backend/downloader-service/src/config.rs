//! Configuration for the downloader service.

use serde::Deserialize;
use std::collections::HashMap;
use task_queue::BrokerConfig;
use vget_common::config::{self, DatabaseConfig};
use vget_common::ServiceError;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub rabbitmq: BrokerConfig,
    pub redis: RedisConfig,
    pub worker: WorkerConfig,
    pub ytdlp: YtdlpConfig,
    pub storage: StorageConfig,
    pub cleanup: CleanupConfig,
    pub retry: RetryConfig,
    pub asset_service: AssetServiceConfig,
    #[serde(default)]
    pub proxy_api: Option<ProxyApiConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    pub pool_size: usize,
    pub max_concurrent: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YtdlpConfig {
    pub binary_path: String,
    /// Seconds a single download may run before the subprocess is aborted.
    pub timeout_secs: u64,
    pub concurrent_fragments: u32,
    #[serde(default)]
    pub default_args: Vec<String>,
    #[serde(default)]
    pub platform_args: HashMap<String, Vec<String>>,
    pub cookie_temp_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub base_path: String,
    /// Retention of quick-mode artifacts, in seconds.
    pub tmp_ttl_secs: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CleanupConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub batch_size: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_interval_secs: u64,
    pub max_interval_secs: u64,
}

impl RetryConfig {
    /// Exponential backoff delay for the given attempt, capped at the
    /// configured maximum.
    pub fn delay(&self, attempt: u32) -> std::time::Duration {
        let exp = self
            .initial_interval_secs
            .saturating_mul(1u64 << attempt.min(16));
        std::time::Duration::from_secs(exp.min(self.max_interval_secs))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetServiceConfig {
    pub addr: String,
}

/// External proxy-vendor API; used instead of the asset pool when
/// enabled.
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyApiConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_proxy_api_timeout")]
    pub timeout_secs: u64,
}

fn default_proxy_api_timeout() -> u64 {
    10
}

impl Config {
    pub fn load(path: &std::path::Path) -> Result<Self, ServiceError> {
        let mut cfg: Config = config::load_yaml(path)?;
        cfg.database.apply_env();
        config::override_from_env(&mut cfg.redis.url, "REDIS_URL");
        config::override_from_env(&mut cfg.rabbitmq.url, "RABBITMQ_URL");
        if let Some(api) = cfg.proxy_api.as_mut() {
            config::override_from_env(&mut api.api_key, "PROXY_API_KEY");
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delay_doubles_and_caps() {
        let cfg = RetryConfig {
            max_attempts: 5,
            initial_interval_secs: 1,
            max_interval_secs: 8,
        };
        assert_eq!(cfg.delay(0).as_secs(), 1);
        assert_eq!(cfg.delay(1).as_secs(), 2);
        assert_eq!(cfg.delay(2).as_secs(), 4);
        assert_eq!(cfg.delay(3).as_secs(), 8);
        assert_eq!(cfg.delay(10).as_secs(), 8);
    }
}
