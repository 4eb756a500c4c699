//! History listing, deletion and user statistics.

use sqlx::PgPool;
use tracing::{info, warn};

use crate::config::PaginationConfig;
use crate::db::history_repo;
use crate::error::{AssetError, Result};
use crate::models::{HistoryFilter, HistoryRow};
use vget_common::HistoryStatus;

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
    if user_id.is_empty() || task_id.is_empty() || url.is_empty() {
        return Err(AssetError::InvalidInput(
            "user_id, task_id and url are required".into(),
        ));
    }
    history_repo::create(pool, user_id, task_id, url, platform, title, mode, quality).await
}

pub async fn query(
    pool: &PgPool,
    pagination: &PaginationConfig,
    mut filter: HistoryFilter,
) -> Result<(i64, Vec<HistoryRow>)> {
    filter.page = filter.page.max(1);
    if filter.page_size < 1 {
        filter.page_size = pagination.default_page_size;
    }
    filter.page_size = filter.page_size.min(pagination.max_page_size);
    history_repo::query(pool, &filter).await
}

/// Delete a history row owned by the user. Completed rows also lose
/// their on-disk artifact; a missing file is tolerated, other filesystem
/// errors are logged but do not fail the deletion.
pub async fn delete(pool: &PgPool, id: i64, user_id: &str) -> Result<()> {
    let row = history_repo::get_by_id_and_user(pool, id, user_id)
        .await?
        .ok_or(AssetError::NotFound("history record"))?;

    let removed = history_repo::delete(pool, id, user_id).await?;
    if removed == 0 {
        return Err(AssetError::NotFound("history record"));
    }

    let deletable = matches!(
        HistoryStatus::parse(&row.status),
        Some(s) if s.may_carry_file()
    );
    if deletable {
        if let Some(path) = row.file_path.as_deref() {
            match tokio::fs::remove_file(path).await {
                Ok(()) => info!(history_id = id, path = %path, "deleted artifact"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(history_id = id, path = %path, error = %e, "failed to delete artifact"),
            }
        }
    }

    Ok(())
}

pub struct UserStats {
    pub total_downloads: i64,
    pub completed: i64,
    pub failed: i64,
    pub total_bytes: i64,
    pub top_platforms: Vec<(String, i64)>,
    pub daily_activity: Vec<(chrono::NaiveDate, i64)>,
}

pub async fn user_stats(pool: &PgPool, user_id: &str) -> Result<UserStats> {
    let total_downloads = history_repo::total_count(pool, user_id).await?;
    let completed = history_repo::count_by_status(pool, user_id, "completed").await?;
    let failed = history_repo::count_by_status(pool, user_id, "failed").await?;
    let total_bytes = history_repo::total_completed_bytes(pool, user_id).await?;
    let top_platforms = history_repo::platform_stats(pool, user_id, 5).await?;
    let daily_activity = history_repo::daily_activity(pool, user_id, 30).await?;

    Ok(UserStats {
        total_downloads,
        completed,
        failed,
        total_bytes,
        top_platforms,
        daily_activity,
    })
}

/// File info for the gateway's streaming endpoint. Only rows whose state
/// may carry a file are downloadable.
pub async fn file_info(pool: &PgPool, id: i64, user_id: &str) -> Result<HistoryRow> {
    let row = history_repo::get_by_id_and_user(pool, id, user_id)
        .await?
        .ok_or(AssetError::NotFound("history record"))?;

    let downloadable = matches!(
        HistoryStatus::parse(&row.status),
        Some(s) if s.may_carry_file()
    );
    if !downloadable || row.file_path.is_none() {
        return Err(AssetError::PreconditionFailed("download not complete".into()));
    }

    Ok(row)
}
