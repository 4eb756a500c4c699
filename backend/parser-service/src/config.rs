//! Configuration for the parser service.

use serde::Deserialize;
use vget_common::config;
use vget_common::ServiceError;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub redis: RedisConfig,
    pub ytdlp: YtdlpConfig,
    pub cache: CacheConfig,
    pub asset_service: AssetServiceConfig,
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
pub struct YtdlpConfig {
    pub binary_path: String,
    /// Seconds allowed for a metadata query before it is classified as a
    /// timeout.
    pub timeout_secs: u64,
    pub max_concurrent: usize,
    #[serde(default)]
    pub default_args: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetServiceConfig {
    pub addr: String,
    #[serde(default = "default_true")]
    pub enable_cookies: bool,
    pub cookie_temp_dir: String,
}

fn default_true() -> bool {
    true
}

impl Config {
    pub fn load(path: &std::path::Path) -> Result<Self, ServiceError> {
        let mut cfg: Config = config::load_yaml(path)?;
        config::override_from_env(&mut cfg.redis.url, "REDIS_URL");
        Ok(cfg)
    }
}
