//! Cookie checkout, usage accounting and management.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;

use crate::db::cookie_repo;
use crate::error::{AssetError, Result};
use crate::models::Cookie;

/// Check out the best available cookie for a platform.
///
/// Returns `Ok(None)` when the pool has nothing usable; callers treat
/// that as "proceed without a cookie", not as an error.
pub async fn checkout(pool: &PgPool, platform: &str) -> Result<Option<Cookie>> {
    let cookie = cookie_repo::get_available(pool, platform).await?;
    if let Some(ref c) = cookie {
        info!(cookie_id = c.id, platform = %platform, use_count = c.use_count, "cookie checked out");
    }
    Ok(cookie)
}

/// Fetch the raw payload of a specific cookie (used by the downloader to
/// reproduce the parser's extraction conditions).
pub async fn content(pool: &PgPool, id: i64) -> Result<String> {
    let cookie = cookie_repo::get_by_id(pool, id)
        .await?
        .ok_or(AssetError::NotFound("cookie"))?;
    Ok(cookie.content)
}

/// Record the outcome of a use. The cooldown stored on the cookie row is
/// applied here, after the fact, so the selection query stays lock-free.
pub async fn report_usage(pool: &PgPool, id: i64, success: bool) -> Result<()> {
    let cookie = cookie_repo::get_by_id(pool, id)
        .await?
        .ok_or(AssetError::NotFound("cookie"))?;
    cookie_repo::update_usage(pool, id, success, cookie.freeze_seconds).await?;
    info!(cookie_id = id, success, freeze_seconds = cookie.freeze_seconds, "cookie usage reported");
    Ok(())
}

pub async fn freeze(pool: &PgPool, id: i64, seconds: i64) -> Result<DateTime<Utc>> {
    if seconds <= 0 {
        return Err(AssetError::InvalidInput(
            "freeze_seconds must be positive".into(),
        ));
    }
    let frozen_until = cookie_repo::freeze(pool, id, seconds).await?;
    info!(cookie_id = id, %frozen_until, "cookie frozen");
    Ok(frozen_until)
}

pub async fn create(
    pool: &PgPool,
    platform: &str,
    name: &str,
    content: &str,
    expire_at: Option<DateTime<Utc>>,
    freeze_seconds: i64,
) -> Result<i64> {
    if platform.is_empty() || content.is_empty() {
        return Err(AssetError::InvalidInput(
            "platform and content are required".into(),
        ));
    }
    cookie_repo::create(pool, platform, name, content, expire_at, freeze_seconds).await
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<()> {
    let removed = cookie_repo::delete(pool, id).await?;
    if removed == 0 {
        return Err(AssetError::NotFound("cookie"));
    }
    Ok(())
}

pub async fn list(
    pool: &PgPool,
    platform: Option<&str>,
    status: Option<&str>,
    page: i32,
    page_size: i32,
    max_page_size: i32,
) -> Result<(i64, Vec<Cookie>)> {
    let page = page.max(1);
    let page_size = page_size.clamp(1, max_page_size);
    cookie_repo::list(pool, platform, status, page, page_size).await
}
