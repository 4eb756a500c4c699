//! Row types and derived views for the resource pool.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveTime, TimeZone, Timelike, Utc};
use serde::Serialize;

/// A platform credential in netscape cookie format.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Cookie {
    pub id: i64,
    pub platform: String,
    pub name: String,
    pub content: String,
    pub expire_at: Option<DateTime<Utc>>,
    pub frozen_until: Option<DateTime<Utc>>,
    pub freeze_seconds: i64,
    pub last_used_at: Option<DateTime<Utc>>,
    pub use_count: i64,
    pub success_count: i64,
    pub fail_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Derived view over a cookie; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CookieStatus {
    Active,
    Frozen,
    Expired,
}

impl CookieStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CookieStatus::Active => "active",
            CookieStatus::Frozen => "frozen",
            CookieStatus::Expired => "expired",
        }
    }
}

impl Cookie {
    /// Effective status is a pure function of wall time and stored fields.
    /// `expire_at == now` counts as expired; `frozen_until == now` counts
    /// as not frozen.
    pub fn effective_status(&self, now: DateTime<Utc>) -> CookieStatus {
        if let Some(expire_at) = self.expire_at {
            if now >= expire_at {
                return CookieStatus::Expired;
            }
        }
        if let Some(frozen_until) = self.frozen_until {
            if now < frozen_until {
                return CookieStatus::Frozen;
            }
        }
        CookieStatus::Active
    }
}

/// An egress proxy.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Proxy {
    pub id: i64,
    pub host: String,
    pub port: i32,
    pub username: String,
    pub password: String,
    pub protocol: String,
    pub region: String,
    pub status: String,
    pub last_check_at: Option<DateTime<Utc>>,
    pub last_check_result: Option<String>,
    pub success_count: i64,
    pub fail_count: i64,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const PROXY_STATUS_ACTIVE: &str = "active";
pub const PROXY_STATUS_INACTIVE: &str = "inactive";

impl Proxy {
    /// Assemble `scheme://[user:pass@]host:port`.
    pub fn url(&self) -> String {
        if !self.username.is_empty() && !self.password.is_empty() {
            format!(
                "{}://{}:{}@{}:{}",
                self.protocol, self.username, self.password, self.host, self.port
            )
        } else {
            format!("{}://{}:{}", self.protocol, self.host, self.port)
        }
    }
}

/// Per-user daily quota row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserQuota {
    pub id: i64,
    pub user_id: String,
    pub daily_limit: i32,
    pub daily_used: i32,
    pub reset_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserQuota {
    pub fn remaining(&self) -> i32 {
        (self.daily_limit - self.daily_used).max(0)
    }
}

/// A download history row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HistoryRow {
    pub id: i64,
    pub task_id: String,
    pub user_id: String,
    pub url: String,
    pub platform: String,
    pub title: String,
    pub mode: String,
    pub quality: String,
    pub file_path: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<i64>,
    pub file_hash: Option<String>,
    pub status: String,
    pub error_message: Option<String>,
    pub retry_count: i32,
    pub expire_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// History list filter; sort columns outside the whitelist fall back to
/// `created_at DESC`.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub user_id: String,
    pub status: Option<String>,
    pub platform: Option<String>,
    pub page: i32,
    pub page_size: i32,
    pub sort_by: String,
    pub sort_order: String,
}

const ALLOWED_SORT_COLUMNS: [&str; 4] = ["created_at", "file_size", "status", "platform"];

impl HistoryFilter {
    pub fn sort_column(&self) -> &str {
        if ALLOWED_SORT_COLUMNS.contains(&self.sort_by.as_str()) {
            self.sort_by.as_str()
        } else {
            "created_at"
        }
    }

    pub fn sort_direction(&self) -> &'static str {
        if self.sort_order.eq_ignore_ascii_case("asc") {
            "ASC"
        } else {
            "DESC"
        }
    }
}

/// Next quota reset instant: the next occurrence of `reset_hour` o'clock
/// in the configured local timezone, expressed in UTC.
pub fn next_reset_at(
    now: DateTime<Utc>,
    tz_offset_hours: i32,
    reset_hour: u32,
) -> DateTime<Utc> {
    let offset = FixedOffset::east_opt(tz_offset_hours * 3600)
        .expect("tz offset out of range, fix config");
    let local = now.with_timezone(&offset);
    let reset_time = NaiveTime::from_hms_opt(reset_hour.min(23), 0, 0)
        .expect("reset hour out of range");

    let mut date = local.date_naive();
    if local.time() >= reset_time {
        date += Duration::days(1);
    }

    // A fixed offset has no DST gaps, the local datetime is always valid.
    let local_reset = offset
        .with_ymd_and_hms(date.year(), date.month(), date.day(), reset_time.hour(), 0, 0)
        .single()
        .expect("fixed-offset datetime is unambiguous");
    local_reset.with_timezone(&Utc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn cookie_at(
        expire_at: Option<DateTime<Utc>>,
        frozen_until: Option<DateTime<Utc>>,
    ) -> Cookie {
        let now = Utc::now();
        Cookie {
            id: 1,
            platform: "youtube".into(),
            name: "c1".into(),
            content: "# Netscape HTTP Cookie File".into(),
            expire_at,
            frozen_until,
            freeze_seconds: 0,
            last_used_at: None,
            use_count: 0,
            success_count: 0,
            fail_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn effective_status_boundaries() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();

        // expire_at == now is expired (>= comparison)
        let c = cookie_at(Some(now), None);
        assert_eq!(c.effective_status(now), CookieStatus::Expired);

        // frozen_until == now is NOT frozen (strict < comparison)
        let c = cookie_at(None, Some(now));
        assert_eq!(c.effective_status(now), CookieStatus::Active);

        let c = cookie_at(None, Some(now + Duration::seconds(1)));
        assert_eq!(c.effective_status(now), CookieStatus::Frozen);

        // expiry wins over freeze
        let c = cookie_at(Some(now), Some(now + Duration::seconds(60)));
        assert_eq!(c.effective_status(now), CookieStatus::Expired);
    }

    #[test]
    fn proxy_url_includes_auth_only_when_present() {
        let now = Utc::now();
        let mut p = Proxy {
            id: 1,
            host: "10.0.0.2".into(),
            port: 8080,
            username: String::new(),
            password: String::new(),
            protocol: "http".into(),
            region: "us".into(),
            status: PROXY_STATUS_ACTIVE.into(),
            last_check_at: None,
            last_check_result: None,
            success_count: 0,
            fail_count: 0,
            last_used_at: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(p.url(), "http://10.0.0.2:8080");

        p.username = "u".into();
        p.password = "p".into();
        assert_eq!(p.url(), "http://u:p@10.0.0.2:8080");
    }

    #[test]
    fn sort_column_whitelist_falls_back() {
        let mut f = HistoryFilter {
            user_id: "u".into(),
            sort_by: "file_size".into(),
            ..Default::default()
        };
        assert_eq!(f.sort_column(), "file_size");

        f.sort_by = "id; DROP TABLE download_history".into();
        assert_eq!(f.sort_column(), "created_at");

        f.sort_order = "asc".into();
        assert_eq!(f.sort_direction(), "ASC");
        f.sort_order = "whatever".into();
        assert_eq!(f.sort_direction(), "DESC");
    }

    #[test]
    fn next_reset_is_local_midnight() {
        // 2025-06-01 22:30 UTC in UTC+8 is 2025-06-02 06:30 local,
        // so the next local midnight is 2025-06-03 00:00 +08 = 06-02 16:00 UTC.
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 22, 30, 0).unwrap();
        let reset = next_reset_at(now, 8, 0);
        assert_eq!(reset, Utc.with_ymd_and_hms(2025, 6, 2, 16, 0, 0).unwrap());

        // Before local midnight the reset is the same local day.
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap(); // 18:00 +08
        let reset = next_reset_at(now, 8, 0);
        assert_eq!(reset, Utc.with_ymd_and_hms(2025, 6, 1, 16, 0, 0).unwrap());
    }

    #[test]
    fn reset_hour_other_than_midnight() {
        // 03:00 local in UTC-5 at 01:00 local: same day 03:00 -05 = 08:00 UTC.
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 6, 0, 0).unwrap(); // 01:00 -05
        let reset = next_reset_at(now, -5, 3);
        assert_eq!(reset, Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap());

        // At exactly the reset hour the next window is tomorrow.
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap(); // 03:00 -05
        let reset = next_reset_at(now, -5, 3);
        assert_eq!(reset, Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap());
    }

    #[test]
    fn quota_remaining_never_negative() {
        let q = UserQuota {
            id: 1,
            user_id: "u".into(),
            daily_limit: 5,
            daily_used: 9,
            reset_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(q.remaining(), 0);
    }
}
