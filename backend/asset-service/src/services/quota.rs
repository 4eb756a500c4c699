//! Quota checks and consumption.

use sqlx::PgPool;
use tracing::info;

use crate::config::QuotaConfig;
use crate::db::quota_repo;
use crate::error::Result;
use crate::models::UserQuota;

/// Default limit for a role: vip and admin accounts get the vip limit.
fn limit_for_role(cfg: &QuotaConfig, role: &str) -> i32 {
    match role {
        "vip" | "admin" => cfg.vip_daily_limit,
        _ => cfg.default_daily_limit,
    }
}

pub async fn check(pool: &PgPool, cfg: &QuotaConfig, user_id: &str, role: &str) -> Result<UserQuota> {
    quota_repo::check(
        pool,
        user_id,
        limit_for_role(cfg, role),
        cfg.tz_offset_hours,
        cfg.reset_hour,
    )
    .await
}

pub async fn consume(
    pool: &PgPool,
    cfg: &QuotaConfig,
    user_id: &str,
    role: &str,
) -> Result<UserQuota> {
    let quota = quota_repo::consume(
        pool,
        user_id,
        limit_for_role(cfg, role),
        cfg.tz_offset_hours,
        cfg.reset_hour,
    )
    .await?;
    info!(
        user_id = %user_id,
        daily_used = quota.daily_used,
        daily_limit = quota.daily_limit,
        "quota consumed"
    );
    Ok(quota)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> QuotaConfig {
        QuotaConfig {
            default_daily_limit: 10,
            vip_daily_limit: 100,
            reset_hour: 0,
            tz_offset_hours: 0,
        }
    }

    #[test]
    fn vip_and_admin_get_vip_limit() {
        let cfg = cfg();
        assert_eq!(limit_for_role(&cfg, "user"), 10);
        assert_eq!(limit_for_role(&cfg, "vip"), 100);
        assert_eq!(limit_for_role(&cfg, "admin"), 100);
        assert_eq!(limit_for_role(&cfg, ""), 10);
    }
}
