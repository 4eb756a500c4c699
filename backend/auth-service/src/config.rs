//! Configuration for the auth service.

use serde::Deserialize;
use vget_common::config::{self, DatabaseConfig};
use vget_common::ServiceError;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub session: SessionConfig,
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
pub struct JwtConfig {
    pub secret: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Live sessions per user; the oldest is evicted past this cap.
    pub max_per_user: i64,
    pub reap_interval_secs: u64,
}

impl Config {
    pub fn load(path: &std::path::Path) -> Result<Self, ServiceError> {
        let mut cfg: Config = config::load_yaml(path)?;
        cfg.database.apply_env();
        config::override_from_env(&mut cfg.redis.url, "REDIS_URL");
        config::override_from_env(&mut cfg.jwt.secret, "JWT_SECRET");
        Ok(cfg)
    }
}
