//! Proxy persistence.

use chrono::Utc;
use sqlx::PgPool;

use crate::error::Result;
use crate::models::Proxy;

pub async fn create(
    pool: &PgPool,
    host: &str,
    port: i32,
    username: &str,
    password: &str,
    protocol: &str,
    region: &str,
    status: &str,
) -> Result<i64> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO proxies (host, port, username, password, protocol, region, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, now(), now())
        RETURNING id
        "#,
    )
    .bind(host)
    .bind(port)
    .bind(username)
    .bind(password)
    .bind(protocol)
    .bind(region)
    .bind(status)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

pub async fn get_by_id(pool: &PgPool, id: i64) -> Result<Option<Proxy>> {
    let proxy = sqlx::query_as::<_, Proxy>("SELECT * FROM proxies WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(proxy)
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM proxies WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Checkout: least-recently-used active proxy, preferring higher success
/// counts among equally-idle candidates.
pub async fn get_available(
    pool: &PgPool,
    protocol: Option<&str>,
    region: Option<&str>,
) -> Result<Option<Proxy>> {
    let mut builder: sqlx::QueryBuilder<sqlx::Postgres> =
        sqlx::QueryBuilder::new("SELECT * FROM proxies WHERE status = ");
    builder.push_bind("active");

    if let Some(protocol) = protocol {
        builder.push(" AND protocol = ").push_bind(protocol);
    }
    if let Some(region) = region {
        builder.push(" AND region = ").push_bind(region);
    }
    builder.push(" ORDER BY last_used_at ASC NULLS FIRST, success_count DESC LIMIT 1");

    let proxy = builder.build_query_as::<Proxy>().fetch_optional(pool).await?;
    Ok(proxy)
}

pub async fn update_usage(pool: &PgPool, id: i64, success: bool) -> Result<()> {
    let now = Utc::now();
    let query = if success {
        "UPDATE proxies SET success_count = success_count + 1, last_used_at = $2, updated_at = $2 WHERE id = $1"
    } else {
        "UPDATE proxies SET fail_count = fail_count + 1, last_used_at = $2, updated_at = $2 WHERE id = $1"
    };

    sqlx::query(query).bind(id).bind(now).execute(pool).await?;
    Ok(())
}

pub async fn update_health_check(
    pool: &PgPool,
    id: i64,
    status: &str,
    result: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE proxies
        SET status = $2, last_check_at = now(), last_check_result = $3, updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(status)
    .bind(result)
    .execute(pool)
    .await?;

    Ok(())
}

/// Paginated list with optional stored-status / protocol / region filters.
pub async fn list(
    pool: &PgPool,
    status: Option<&str>,
    protocol: Option<&str>,
    region: Option<&str>,
    page: i32,
    page_size: i32,
) -> Result<(i64, Vec<Proxy>)> {
    let mut builder: sqlx::QueryBuilder<sqlx::Postgres> = sqlx::QueryBuilder::new("SELECT * FROM proxies WHERE TRUE");
    let mut count_builder: sqlx::QueryBuilder<sqlx::Postgres> = sqlx::QueryBuilder::new("SELECT COUNT(*) FROM proxies WHERE TRUE");

    for b in [&mut builder, &mut count_builder] {
        if let Some(status) = status {
            b.push(" AND status = ").push_bind(status);
        }
        if let Some(protocol) = protocol {
            b.push(" AND protocol = ").push_bind(protocol);
        }
        if let Some(region) = region {
            b.push(" AND region = ").push_bind(region);
        }
    }

    let total: i64 = count_builder.build_query_scalar().fetch_one(pool).await?;

    let offset = (page.max(1) - 1) * page_size;
    builder
        .push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(page_size)
        .push(" OFFSET ")
        .push_bind(offset);

    let items = builder.build_query_as::<Proxy>().fetch_all(pool).await?;
    Ok((total, items))
}
