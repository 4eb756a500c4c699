//! Cookie persistence.
//!
//! Checkout is a non-locking read; the same cookie may be handed to two
//! concurrent requests. Double-use is accounted for in the counters and
//! narrowed by freeze-on-use; strict exclusion is an explicit non-goal.

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

use crate::error::Result;
use crate::models::Cookie;

pub async fn create(
    pool: &PgPool,
    platform: &str,
    name: &str,
    content: &str,
    expire_at: Option<DateTime<Utc>>,
    freeze_seconds: i64,
) -> Result<i64> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO cookies (platform, name, content, expire_at, freeze_seconds, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, now(), now())
        RETURNING id
        "#,
    )
    .bind(platform)
    .bind(name)
    .bind(content)
    .bind(expire_at)
    .bind(freeze_seconds)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

pub async fn get_by_id(pool: &PgPool, id: i64) -> Result<Option<Cookie>> {
    let cookie = sqlx::query_as::<_, Cookie>("SELECT * FROM cookies WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(cookie)
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM cookies WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Select the checkout candidate for a platform: not expired, not frozen,
/// least used, tie-broken by oldest `last_used_at` with NULLs first.
pub async fn get_available(pool: &PgPool, platform: &str) -> Result<Option<Cookie>> {
    let now = Utc::now();
    let cookie = sqlx::query_as::<_, Cookie>(
        r#"
        SELECT * FROM cookies
        WHERE platform = $1
          AND (expire_at IS NULL OR expire_at > $2)
          AND (frozen_until IS NULL OR frozen_until < $2)
        ORDER BY use_count ASC, last_used_at ASC NULLS FIRST
        LIMIT 1
        "#,
    )
    .bind(platform)
    .bind(now)
    .fetch_optional(pool)
    .await?;

    Ok(cookie)
}

/// Record a usage outcome. Bumps `use_count` plus the success or fail
/// counter, stamps `last_used_at`, and applies the cooldown only when the
/// cookie carries a non-zero `freeze_seconds`.
pub async fn update_usage(pool: &PgPool, id: i64, success: bool, freeze_seconds: i64) -> Result<()> {
    let now = Utc::now();

    if freeze_seconds == 0 {
        let query = if success {
            r#"
            UPDATE cookies
            SET use_count = use_count + 1, success_count = success_count + 1,
                last_used_at = $2, updated_at = $2
            WHERE id = $1
            "#
        } else {
            r#"
            UPDATE cookies
            SET use_count = use_count + 1, fail_count = fail_count + 1,
                last_used_at = $2, updated_at = $2
            WHERE id = $1
            "#
        };
        sqlx::query(query).bind(id).bind(now).execute(pool).await?;
    } else {
        let frozen_until = now + Duration::seconds(freeze_seconds);
        let query = if success {
            r#"
            UPDATE cookies
            SET use_count = use_count + 1, success_count = success_count + 1,
                last_used_at = $2, frozen_until = $3, updated_at = $2
            WHERE id = $1
            "#
        } else {
            r#"
            UPDATE cookies
            SET use_count = use_count + 1, fail_count = fail_count + 1,
                last_used_at = $2, frozen_until = $3, updated_at = $2
            WHERE id = $1
            "#
        };
        sqlx::query(query)
            .bind(id)
            .bind(now)
            .bind(frozen_until)
            .execute(pool)
            .await?;
    }

    Ok(())
}

/// Explicit freeze: overwrites `frozen_until` regardless of prior value.
pub async fn freeze(pool: &PgPool, id: i64, freeze_seconds: i64) -> Result<DateTime<Utc>> {
    let frozen_until = Utc::now() + Duration::seconds(freeze_seconds);

    sqlx::query("UPDATE cookies SET frozen_until = $2, updated_at = now() WHERE id = $1")
        .bind(id)
        .bind(frozen_until)
        .execute(pool)
        .await?;

    Ok(frozen_until)
}

/// Paginated list, optionally filtered by platform and derived status.
pub async fn list(
    pool: &PgPool,
    platform: Option<&str>,
    status: Option<&str>,
    page: i32,
    page_size: i32,
) -> Result<(i64, Vec<Cookie>)> {
    let now = Utc::now();
    let mut builder: sqlx::QueryBuilder<sqlx::Postgres> = sqlx::QueryBuilder::new("SELECT * FROM cookies WHERE TRUE");
    let mut count_builder: sqlx::QueryBuilder<sqlx::Postgres> = sqlx::QueryBuilder::new("SELECT COUNT(*) FROM cookies WHERE TRUE");

    for b in [&mut builder, &mut count_builder] {
        if let Some(platform) = platform {
            b.push(" AND platform = ").push_bind(platform);
        }
        // Derived-status filters expressed over the stored fields; the
        // stored rows never carry a status column.
        match status {
            Some("expired") => {
                b.push(" AND expire_at IS NOT NULL AND expire_at <= ").push_bind(now);
            }
            Some("frozen") => {
                b.push(" AND (expire_at IS NULL OR expire_at > ").push_bind(now);
                b.push(") AND frozen_until IS NOT NULL AND frozen_until > ").push_bind(now);
            }
            Some("active") => {
                b.push(" AND (expire_at IS NULL OR expire_at > ").push_bind(now);
                b.push(") AND (frozen_until IS NULL OR frozen_until < ").push_bind(now);
                b.push(")");
            }
            _ => {}
        }
    }

    let total: i64 = count_builder.build_query_scalar().fetch_one(pool).await?;

    let offset = (page.max(1) - 1) * page_size;
    builder
        .push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(page_size)
        .push(" OFFSET ")
        .push_bind(offset);

    let items = builder.build_query_as::<Cookie>().fetch_all(pool).await?;
    Ok((total, items))
}
