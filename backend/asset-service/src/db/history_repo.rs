//! Download history persistence.

use sqlx::PgPool;

use crate::error::Result;
use crate::models::{HistoryFilter, HistoryRow};

pub async fn create(
    pool: &PgPool,
    user_id: &str,
    task_id: &str,
    url: &str,
    platform: &str,
    title: &str,
    mode: &str,
    quality: &str,
) -> Result<i64> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO download_history (task_id, user_id, url, platform, title, mode, quality, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', now(), now())
        RETURNING id
        "#,
    )
    .bind(task_id)
    .bind(user_id)
    .bind(url)
    .bind(platform)
    .bind(title)
    .bind(mode)
    .bind(quality)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

pub async fn get_by_id_and_user(
    pool: &PgPool,
    id: i64,
    user_id: &str,
) -> Result<Option<HistoryRow>> {
    let row = sqlx::query_as::<_, HistoryRow>(
        "SELECT * FROM download_history WHERE id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Filtered, sorted, paginated listing. The sort column comes from the
/// whitelist in `HistoryFilter`, never from raw input.
pub async fn query(pool: &PgPool, filter: &HistoryFilter) -> Result<(i64, Vec<HistoryRow>)> {
    let mut builder: sqlx::QueryBuilder<sqlx::Postgres> =
        sqlx::QueryBuilder::new("SELECT * FROM download_history WHERE user_id = ");
    let mut count_builder: sqlx::QueryBuilder<sqlx::Postgres> =
        sqlx::QueryBuilder::new("SELECT COUNT(*) FROM download_history WHERE user_id = ");

    for b in [&mut builder, &mut count_builder] {
        b.push_bind(filter.user_id.as_str());
        if let Some(status) = filter.status.as_deref() {
            b.push(" AND status = ").push_bind(status);
        }
        if let Some(platform) = filter.platform.as_deref() {
            b.push(" AND platform = ").push_bind(platform);
        }
    }

    let total: i64 = count_builder.build_query_scalar().fetch_one(pool).await?;

    let page = filter.page.max(1);
    let offset = (page - 1) * filter.page_size;
    builder.push(format_args!(
        " ORDER BY {} {} LIMIT ",
        filter.sort_column(),
        filter.sort_direction()
    ));
    builder.push_bind(filter.page_size);
    builder.push(" OFFSET ").push_bind(offset);

    let items = builder.build_query_as::<HistoryRow>().fetch_all(pool).await?;
    Ok((total, items))
}

/// Owner-scoped delete. Returns the number of rows removed.
pub async fn delete(pool: &PgPool, id: i64, user_id: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM download_history WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn total_count(pool: &PgPool, user_id: &str) -> Result<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM download_history WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await?;
    Ok(count)
}

pub async fn count_by_status(pool: &PgPool, user_id: &str, status: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM download_history WHERE user_id = $1 AND status = $2",
    )
    .bind(user_id)
    .bind(status)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

pub async fn total_completed_bytes(pool: &PgPool, user_id: &str) -> Result<i64> {
    let size: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(file_size), 0) FROM download_history WHERE user_id = $1 AND status = 'completed'",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(size)
}

pub async fn platform_stats(
    pool: &PgPool,
    user_id: &str,
    limit: i64,
) -> Result<Vec<(String, i64)>> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT platform, COUNT(*) as count
        FROM download_history
        WHERE user_id = $1
        GROUP BY platform
        ORDER BY count DESC
        LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn daily_activity(
    pool: &PgPool,
    user_id: &str,
    days: i64,
) -> Result<Vec<(chrono::NaiveDate, i64)>> {
    let rows: Vec<(chrono::NaiveDate, i64)> = sqlx::query_as(
        r#"
        SELECT DATE(created_at) as date, COUNT(*) as count
        FROM download_history
        WHERE user_id = $1 AND created_at >= now() - ($2 || ' days')::interval
        GROUP BY DATE(created_at)
        ORDER BY date DESC
        "#,
    )
    .bind(user_id)
    .bind(days.to_string())
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
