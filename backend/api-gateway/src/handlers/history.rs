//! User history, quota and stats endpoints.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use grpc_clients::vget::asset::v1::{
    CheckQuotaRequest, DeleteHistoryRequest, GetHistoryRequest, GetUserStatsRequest,
};

use crate::error::GatewayError;
use crate::handlers::with_deadline;
use crate::middleware::auth::authenticated_user;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub page: i32,
    #[serde(default)]
    pub page_size: i32,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub sort_by: String,
    #[serde(default)]
    pub sort_order: String,
}

pub async fn get_history(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, GatewayError> {
    let user = authenticated_user(&req)?;

    let mut asset = state.clients.asset.clone();
    let resp = with_deadline(
        state.config.grpc.timeout_secs,
        "asset",
        asset.get_history(GetHistoryRequest {
            user_id: user.user_id,
            page: query.page,
            page_size: query.page_size,
            status: query.status.clone(),
            platform: query.platform.clone(),
            sort_by: query.sort_by.clone(),
            sort_order: query.sort_order.clone(),
        }),
    )
    .await?;

    let items: Vec<_> = resp
        .items
        .iter()
        .map(|h| {
            json!({
                "id": h.id,
                "task_id": h.task_id,
                "url": h.url,
                "platform": h.platform,
                "title": h.title,
                "mode": h.mode,
                "quality": h.quality,
                "file_size": h.file_size,
                "file_name": h.file_name,
                "file_hash": h.file_hash,
                "status": h.status,
                "error_message": h.error_message,
                "created_at": h.created_at,
                "completed_at": h.completed_at,
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "total": resp.total,
        "page": resp.page,
        "page_size": resp.page_size,
        "items": items,
    })))
}

pub async fn delete_history(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse, GatewayError> {
    let user = authenticated_user(&req)?;
    let history_id = path.into_inner();

    let mut asset = state.clients.asset.clone();
    with_deadline(
        state.config.grpc.timeout_secs,
        "asset",
        asset.delete_history(DeleteHistoryRequest {
            history_id,
            user_id: user.user_id,
        }),
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

pub async fn get_quota(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, GatewayError> {
    let user = authenticated_user(&req)?;

    let mut asset = state.clients.asset.clone();
    let resp = with_deadline(
        state.config.grpc.timeout_secs,
        "asset",
        asset.check_quota(CheckQuotaRequest {
            user_id: user.user_id,
            role: user.role,
        }),
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "daily_limit": resp.daily_limit,
        "daily_used": resp.daily_used,
        "remaining": resp.remaining,
        "reset_at": resp.reset_at,
    })))
}

pub async fn get_stats(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, GatewayError> {
    let user = authenticated_user(&req)?;

    let mut asset = state.clients.asset.clone();
    let resp = with_deadline(
        state.config.grpc.timeout_secs,
        "asset",
        asset.get_user_stats(GetUserStatsRequest {
            user_id: user.user_id,
        }),
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "total_downloads": resp.total_downloads,
        "completed": resp.completed,
        "failed": resp.failed,
        "total_bytes": resp.total_bytes,
        "top_platforms": resp.top_platforms.iter().map(|p| json!({
            "platform": p.platform,
            "count": p.count,
        })).collect::<Vec<_>>(),
        "daily_activity": resp.daily_activity.iter().map(|d| json!({
            "date": d.date,
            "count": d.count,
        })).collect::<Vec<_>>(),
    })))
}
