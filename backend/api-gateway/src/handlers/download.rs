//! The submission protocol.
//!
//! Strict order per request: quota precheck, URL validation, metadata
//! parse, task id, history insert, quota consume, enqueue. This makes
//! "no task enqueued without a history row and a consumed quota slot"
//! an invariant; the converse (a pending history row without a task) is
//! tolerated and later reclaimed.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use grpc_clients::vget::asset::v1::{CheckQuotaRequest, ConsumeQuotaRequest, CreateHistoryRequest};
use grpc_clients::vget::parser::v1::{ParseUrlRequest, ValidateUrlRequest};
use vget_common::{ServiceError, TaskMessage, TaskMode};

use crate::error::GatewayError;
use crate::handlers::with_deadline;
use crate::middleware::auth::authenticated_user;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct DownloadBody {
    pub url: String,
    pub mode: String,
    #[serde(default)]
    pub quality: String,
    #[serde(default)]
    pub format: String,
}

pub async fn submit_download(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<DownloadBody>,
) -> Result<HttpResponse, GatewayError> {
    let user = authenticated_user(&req)?;
    let timeout = state.config.grpc.timeout_secs;

    let mode = TaskMode::parse(&body.mode)
        .ok_or_else(|| GatewayError::bad_request("mode must be quick_download or archive"))?;

    // 1. Quota precheck.
    let mut asset = state.clients.asset.clone();
    let quota = with_deadline(
        timeout,
        "asset",
        asset.check_quota(CheckQuotaRequest {
            user_id: user.user_id.clone(),
            role: user.role.clone(),
        }),
    )
    .await?;
    if quota.remaining <= 0 {
        return Err(ServiceError::QuotaExhausted(
            "daily quota exceeded, please try again tomorrow".into(),
        )
        .into());
    }

    // 2. URL validation.
    let mut parser = state.clients.parser.clone();
    let validation = with_deadline(
        timeout,
        "parser",
        parser.validate_url(ValidateUrlRequest {
            url: body.url.clone(),
        }),
    )
    .await?;
    if !validation.valid {
        return Err(GatewayError::bad_request(format!(
            "invalid URL: {}",
            validation.message
        )));
    }

    // 3. Metadata parse. The cookie and proxy selected here are carried
    // into the task message so the downloader reproduces the same
    // extraction conditions.
    let parsed = with_deadline(
        timeout,
        "parser",
        parser.parse_url(ParseUrlRequest {
            url: body.url.clone(),
            skip_cache: false,
        }),
    )
    .await?;

    // 4. Task id.
    let task_id = Uuid::new_v4().to_string();

    // 5. History row (status pending).
    let history = with_deadline(
        timeout,
        "asset",
        asset.create_history(CreateHistoryRequest {
            user_id: user.user_id.clone(),
            task_id: task_id.clone(),
            url: body.url.clone(),
            platform: validation.platform.clone(),
            title: parsed.title.clone(),
            mode: mode.as_str().to_string(),
            quality: body.quality.clone(),
        }),
    )
    .await?;

    // 6. Quota consume under row lock. A racing exhaustion leaves the
    // pending history row behind for the reaper.
    with_deadline(
        timeout,
        "asset",
        asset.consume_quota(ConsumeQuotaRequest {
            user_id: user.user_id.clone(),
            role: user.role.clone(),
        }),
    )
    .await?;

    // 7. Durable enqueue.
    let task = TaskMessage {
        task_id: task_id.clone(),
        user_id: user.user_id.clone(),
        history_id: history.history_id,
        url: body.url.clone(),
        mode,
        quality: body.quality.clone(),
        format: body.format.clone(),
        platform: validation.platform,
        title: parsed.title,
        cookie_id: parsed.cookie_id,
        proxy_url: parsed.proxy_url,
    };
    state
        .publisher
        .publish(&task)
        .await
        .map_err(|e| GatewayError::internal(format!("failed to submit task: {e}")))?;

    let estimated_time = estimate_download_time(parsed.duration, &body.quality);
    info!(task_id = %task_id, history_id = history.history_id, "task submitted");

    Ok(HttpResponse::Accepted().json(json!({
        "task_id": task_id,
        "history_id": history.history_id,
        "estimated_time": estimated_time,
    })))
}

/// Advisory estimate: a tenth of the runtime plus a quality-dependent
/// floor.
fn estimate_download_time(duration_secs: i64, quality: &str) -> i64 {
    let base = (duration_secs / 10).max(30);
    match quality {
        "1080p" => base + 60,
        "720p" => base + 30,
        _ => base + 15,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_has_quality_floor() {
        assert_eq!(estimate_download_time(0, "1080p"), 90);
        assert_eq!(estimate_download_time(600, "1080p"), 120);
        assert_eq!(estimate_download_time(600, "720p"), 90);
        assert_eq!(estimate_download_time(600, "480p"), 75);
        assert_eq!(estimate_download_time(100, ""), 45);
    }
}
