//! History row transitions owned by the worker, plus the reaper scan.
//!
//! Rows are keyed by task id here: the broker guarantees a single
//! consumer owns a message until ack, so no two workers ever race on the
//! same row.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::Result;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DownloadRecord {
    pub id: i64,
    pub task_id: String,
    pub user_id: String,
    pub status: String,
    pub file_path: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<i64>,
    pub error_message: Option<String>,
    pub expire_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

pub async fn update_processing(pool: &PgPool, task_id: &str) -> Result<()> {
    sqlx::query(
        "UPDATE download_history SET status = 'processing', started_at = now(), updated_at = now() WHERE task_id = $1",
    )
    .bind(task_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Terminal success. The row lands in `pending_cleanup` when an
/// expiry is set (quick mode) and `completed` otherwise.
pub async fn update_complete(
    pool: &PgPool,
    task_id: &str,
    file_path: &str,
    file_name: &str,
    file_hash: &str,
    file_size: i64,
    expire_at: Option<DateTime<Utc>>,
) -> Result<()> {
    let status = if expire_at.is_some() {
        "pending_cleanup"
    } else {
        "completed"
    };

    sqlx::query(
        r#"
        UPDATE download_history
        SET status = $2, file_path = $3, file_name = $4, file_hash = $5,
            file_size = $6, expire_at = $7, completed_at = now(), updated_at = now()
        WHERE task_id = $1
        "#,
    )
    .bind(task_id)
    .bind(status)
    .bind(file_path)
    .bind(file_name)
    .bind(file_hash)
    .bind(file_size)
    .bind(expire_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn update_failed(pool: &PgPool, task_id: &str, error_message: &str) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE download_history
        SET status = 'failed', error_message = $2,
            retry_count = retry_count + 1, updated_at = now()
        WHERE task_id = $1
        "#,
    )
    .bind(task_id)
    .bind(error_message)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_by_task_id(pool: &PgPool, task_id: &str) -> Result<Option<DownloadRecord>> {
    let record = sqlx::query_as::<_, DownloadRecord>(
        r#"
        SELECT id, task_id, user_id, status, file_path, file_name, file_size,
               error_message, expire_at, started_at, completed_at
        FROM download_history WHERE task_id = $1
        "#,
    )
    .bind(task_id)
    .fetch_optional(pool)
    .await?;
    Ok(record)
}

/// Rows due for reaping: pending cleanup with an expiry in the past.
pub async fn find_expired(pool: &PgPool, batch_size: i64) -> Result<Vec<DownloadRecord>> {
    let records = sqlx::query_as::<_, DownloadRecord>(
        r#"
        SELECT id, task_id, user_id, status, file_path, file_name, file_size,
               error_message, expire_at, started_at, completed_at
        FROM download_history
        WHERE status = 'pending_cleanup' AND expire_at < now()
        LIMIT $1
        "#,
    )
    .bind(batch_size)
    .fetch_all(pool)
    .await?;
    Ok(records)
}

/// Flip a reaped row to expired and drop its file path.
pub async fn mark_expired(pool: &PgPool, task_id: &str) -> Result<()> {
    sqlx::query(
        "UPDATE download_history SET status = 'expired', file_path = NULL, updated_at = now() WHERE task_id = $1",
    )
    .bind(task_id)
    .execute(pool)
    .await?;
    Ok(())
}
