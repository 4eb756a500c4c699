use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::Result;
use crate::models::UserSession;

pub async fn create(
    pool: &PgPool,
    user_id: &str,
    refresh_token: &str,
    token_hash: &str,
    device_info: &str,
    ip_address: &str,
    expires_at: DateTime<Utc>,
) -> Result<UserSession> {
    let session = sqlx::query_as::<_, UserSession>(
        r#"
        INSERT INTO user_sessions (user_id, refresh_token, token_hash, device_info, ip_address, expires_at, last_used_at, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, now(), now())
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(refresh_token)
    .bind(token_hash)
    .bind(device_info)
    .bind(ip_address)
    .bind(expires_at)
    .fetch_one(pool)
    .await?;

    Ok(session)
}

pub async fn find_by_refresh_token(
    pool: &PgPool,
    refresh_token: &str,
) -> Result<Option<UserSession>> {
    let session = sqlx::query_as::<_, UserSession>(
        "SELECT * FROM user_sessions WHERE refresh_token = $1 AND expires_at > now()",
    )
    .bind(refresh_token)
    .fetch_optional(pool)
    .await?;
    Ok(session)
}

pub async fn touch(pool: &PgPool, id: i64, token_hash: &str) -> Result<()> {
    sqlx::query("UPDATE user_sessions SET token_hash = $2, last_used_at = now() WHERE id = $1")
        .bind(id)
        .bind(token_hash)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn delete_by_token_hash(pool: &PgPool, token_hash: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM user_sessions WHERE token_hash = $1")
        .bind(token_hash)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn delete_user_sessions(pool: &PgPool, user_id: &str) -> Result<()> {
    sqlx::query("DELETE FROM user_sessions WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn count_user_sessions(pool: &PgPool, user_id: &str) -> Result<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM user_sessions WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await?;
    Ok(count)
}

/// Evict the user's oldest session; used to enforce the per-user cap.
pub async fn delete_oldest_session(pool: &PgPool, user_id: &str) -> Result<()> {
    sqlx::query(
        r#"
        DELETE FROM user_sessions
        WHERE id = (
            SELECT id FROM user_sessions
            WHERE user_id = $1
            ORDER BY created_at ASC
            LIMIT 1
        )
        "#,
    )
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Background reap of expired sessions.
pub async fn delete_expired(pool: &PgPool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM user_sessions WHERE expires_at <= now()")
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
