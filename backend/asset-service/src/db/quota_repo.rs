//! Quota persistence.
//!
//! Check and consume both run inside a transaction holding a row lock;
//! an increment race would otherwise allow exceeding the limit.

use chrono::Utc;
use sqlx::PgPool;

use crate::error::{AssetError, Result};
use crate::models::{next_reset_at, UserQuota};

/// Fetch the quota row under `FOR UPDATE`, creating it with the given
/// default limit when missing, and lazily resetting it when `reset_at`
/// has passed. Returns the row as it stands inside the transaction.
async fn lock_or_create(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: &str,
    default_limit: i32,
    tz_offset_hours: i32,
    reset_hour: u32,
) -> Result<UserQuota> {
    let now = Utc::now();

    let existing = sqlx::query_as::<_, UserQuota>(
        "SELECT id, user_id, daily_limit, daily_used, reset_at, updated_at FROM user_quotas WHERE user_id = $1 FOR UPDATE",
    )
    .bind(user_id)
    .fetch_optional(&mut **tx)
    .await?;

    let mut quota = match existing {
        Some(q) => q,
        None => {
            let reset_at = next_reset_at(now, tz_offset_hours, reset_hour);
            let inserted = sqlx::query_as::<_, UserQuota>(
                r#"
                INSERT INTO user_quotas (user_id, daily_limit, daily_used, reset_at, updated_at)
                VALUES ($1, $2, 0, $3, $4)
                ON CONFLICT (user_id) DO NOTHING
                RETURNING id, user_id, daily_limit, daily_used, reset_at, updated_at
                "#,
            )
            .bind(user_id)
            .bind(default_limit)
            .bind(reset_at)
            .bind(now)
            .fetch_optional(&mut **tx)
            .await?;

            match inserted {
                Some(q) => q,
                // Lost a concurrent-create race: lock the winner's row.
                None => {
                    sqlx::query_as::<_, UserQuota>(
                        "SELECT id, user_id, daily_limit, daily_used, reset_at, updated_at FROM user_quotas WHERE user_id = $1 FOR UPDATE",
                    )
                    .bind(user_id)
                    .fetch_one(&mut **tx)
                    .await?
                }
            }
        }
    };

    if now >= quota.reset_at {
        quota.daily_used = 0;
        quota.reset_at = next_reset_at(now, tz_offset_hours, reset_hour);
    }

    Ok(quota)
}

/// Report current usage after a lazy reset. The reset, if due, is
/// persisted so repeated checks observe the same window.
pub async fn check(
    pool: &PgPool,
    user_id: &str,
    default_limit: i32,
    tz_offset_hours: i32,
    reset_hour: u32,
) -> Result<UserQuota> {
    let mut tx = pool.begin().await?;
    let quota = lock_or_create(&mut tx, user_id, default_limit, tz_offset_hours, reset_hour).await?;

    sqlx::query("UPDATE user_quotas SET daily_used = $1, reset_at = $2, updated_at = $3 WHERE id = $4")
        .bind(quota.daily_used)
        .bind(quota.reset_at)
        .bind(Utc::now())
        .bind(quota.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(quota)
}

/// Increment `daily_used` iff it is below the limit; `QuotaExhausted`
/// otherwise. The transaction rolls back on the exhausted path.
pub async fn consume(
    pool: &PgPool,
    user_id: &str,
    default_limit: i32,
    tz_offset_hours: i32,
    reset_hour: u32,
) -> Result<UserQuota> {
    let mut tx = pool.begin().await?;
    let mut quota =
        lock_or_create(&mut tx, user_id, default_limit, tz_offset_hours, reset_hour).await?;

    if quota.daily_used >= quota.daily_limit {
        tx.rollback().await?;
        return Err(AssetError::QuotaExhausted);
    }

    quota.daily_used += 1;
    sqlx::query("UPDATE user_quotas SET daily_used = $1, reset_at = $2, updated_at = $3 WHERE id = $4")
        .bind(quota.daily_used)
        .bind(quota.reset_at)
        .bind(Utc::now())
        .bind(quota.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(quota)
}
