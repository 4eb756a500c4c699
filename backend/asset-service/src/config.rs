//! Configuration for the asset service.

use serde::Deserialize;
use vget_common::config::{self, DatabaseConfig};
use vget_common::ServiceError;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub quota: QuotaConfig,
    pub proxy: ProxyConfig,
    pub pagination: PaginationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuotaConfig {
    pub default_daily_limit: i32,
    pub vip_daily_limit: i32,
    /// Local hour of day at which quotas reset (0 = midnight).
    #[serde(default)]
    pub reset_hour: u32,
    /// Offset of the deployment's local timezone from UTC, in hours.
    /// Resetting at UTC midnight silently is a correctness bug for
    /// regional deployments, so the offset is explicit.
    #[serde(default)]
    pub tz_offset_hours: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    pub test_url: String,
    pub health_check_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaginationConfig {
    pub default_page_size: i32,
    pub max_page_size: i32,
}

impl Config {
    pub fn load(path: &std::path::Path) -> Result<Self, ServiceError> {
        let mut cfg: Config = config::load_yaml(path)?;
        cfg.database.apply_env();
        Ok(cfg)
    }
}
