//! Configuration for the gateway.

use serde::Deserialize;
use task_queue::BrokerConfig;
use vget_common::config;
use vget_common::ServiceError;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub redis: RedisConfig,
    pub rabbitmq: BrokerConfig,
    pub grpc: GrpcConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_io_timeout")]
    pub client_timeout_secs: u64,
}

fn default_io_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GrpcConfig {
    pub auth_addr: String,
    pub parser_addr: String,
    pub asset_addr: String,
    /// Deadline applied to every downstream call.
    #[serde(default = "default_grpc_timeout")]
    pub timeout_secs: u64,
}

fn default_grpc_timeout() -> u64 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub global_rps: u32,
    pub user_rps: u32,
    pub burst: u32,
}

impl Config {
    pub fn load(path: &std::path::Path) -> Result<Self, ServiceError> {
        let mut cfg: Config = config::load_yaml(path)?;
        config::override_from_env(&mut cfg.redis.url, "REDIS_URL");
        config::override_from_env(&mut cfg.rabbitmq.url, "RABBITMQ_URL");
        Ok(cfg)
    }
}
