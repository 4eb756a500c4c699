//! Proxy checkout, usage accounting and health probing.

use sqlx::PgPool;
use std::time::{Duration, Instant};
use tracing::info;

use crate::config::ProxyConfig;
use crate::db::proxy_repo;
use crate::error::{AssetError, Result};
use crate::models::{Proxy, PROXY_STATUS_ACTIVE, PROXY_STATUS_INACTIVE};

/// Check out the least-recently-used active proxy matching the filters.
/// `Ok(None)` means direct connection.
pub async fn checkout(
    pool: &PgPool,
    protocol: Option<&str>,
    region: Option<&str>,
) -> Result<Option<Proxy>> {
    let proxy = proxy_repo::get_available(pool, protocol, region).await?;
    if let Some(ref p) = proxy {
        info!(proxy_id = p.id, host = %p.host, "proxy checked out");
    }
    Ok(proxy)
}

pub async fn report_usage(pool: &PgPool, id: i64, success: bool) -> Result<()> {
    proxy_repo::update_usage(pool, id, success).await?;
    info!(proxy_id = id, success, "proxy usage reported");
    Ok(())
}

/// Probe a proxy with a HEAD request to the configured test URL.
/// 2xx/3xx means healthy. The stored status reflects the result.
pub async fn check_health(pool: &PgPool, cfg: &ProxyConfig, id: i64) -> Result<(bool, i64, String)> {
    let proxy = proxy_repo::get_by_id(pool, id)
        .await?
        .ok_or(AssetError::NotFound("proxy"))?;

    let started = Instant::now();
    let outcome = probe(cfg, &proxy).await;
    let latency_ms = started.elapsed().as_millis() as i64;

    let (healthy, status, result) = match &outcome {
        Ok(true) => (true, PROXY_STATUS_ACTIVE, "ok".to_string()),
        Ok(false) => (false, PROXY_STATUS_INACTIVE, "unhealthy".to_string()),
        Err(e) => (false, PROXY_STATUS_INACTIVE, e.to_string()),
    };

    proxy_repo::update_health_check(pool, id, status, &result).await?;
    info!(proxy_id = id, healthy, latency_ms, "proxy health checked");
    Ok((healthy, latency_ms, result))
}

async fn probe(cfg: &ProxyConfig, proxy: &Proxy) -> Result<bool> {
    let proxy_url = proxy.url();
    let client = reqwest::Client::builder()
        .proxy(
            reqwest::Proxy::all(&proxy_url)
                .map_err(|e| AssetError::HealthCheck(format!("invalid proxy URL: {e}")))?,
        )
        .timeout(Duration::from_secs(cfg.health_check_timeout_secs))
        .build()
        .map_err(|e| AssetError::HealthCheck(format!("failed to build client: {e}")))?;

    let response = client
        .head(&cfg.test_url)
        .send()
        .await
        .map_err(|e| AssetError::HealthCheck(format!("request failed: {e}")))?;

    let code = response.status().as_u16();
    Ok((200..400).contains(&code))
}

/// Create a proxy, optionally probing it inline; an unhealthy probe
/// stores the row as inactive rather than rejecting it.
pub async fn create(
    pool: &PgPool,
    cfg: &ProxyConfig,
    host: &str,
    port: i32,
    username: &str,
    password: &str,
    protocol: &str,
    region: &str,
    inline_check: bool,
) -> Result<(i64, bool, String)> {
    if host.is_empty() || port <= 0 {
        return Err(AssetError::InvalidInput("host and port are required".into()));
    }
    let protocol = if protocol.is_empty() { "http" } else { protocol };

    let mut status = PROXY_STATUS_ACTIVE;
    let mut check_passed = false;
    let mut check_error = String::new();

    if inline_check {
        let now = chrono::Utc::now();
        let candidate = Proxy {
            id: 0,
            host: host.to_string(),
            port,
            username: username.to_string(),
            password: password.to_string(),
            protocol: protocol.to_string(),
            region: region.to_string(),
            status: PROXY_STATUS_ACTIVE.to_string(),
            last_check_at: None,
            last_check_result: None,
            success_count: 0,
            fail_count: 0,
            last_used_at: None,
            created_at: now,
            updated_at: now,
        };
        match probe(cfg, &candidate).await {
            Ok(true) => check_passed = true,
            Ok(false) => {
                check_error = "health check failed".to_string();
                status = PROXY_STATUS_INACTIVE;
            }
            Err(e) => {
                check_error = e.to_string();
                status = PROXY_STATUS_INACTIVE;
            }
        }
    }

    let id = proxy_repo::create(
        pool, host, port, username, password, protocol, region, status,
    )
    .await?;

    Ok((id, check_passed, check_error))
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<()> {
    let removed = proxy_repo::delete(pool, id).await?;
    if removed == 0 {
        return Err(AssetError::NotFound("proxy"));
    }
    Ok(())
}

pub async fn list(
    pool: &PgPool,
    status: Option<&str>,
    protocol: Option<&str>,
    region: Option<&str>,
    page: i32,
    page_size: i32,
    max_page_size: i32,
) -> Result<(i64, Vec<Proxy>)> {
    let page = page.max(1);
    let page_size = page_size.clamp(1, max_page_size);
    proxy_repo::list(pool, status, protocol, region, page, page_size).await
}
