//! Admin management of the cookie pool.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use grpc_clients::vget::asset::v1::*;

use crate::error::GatewayError;
use crate::handlers::with_deadline;
use crate::middleware::auth::{authenticated_user, AuthenticatedUser};
use crate::AppState;

pub(crate) fn require_admin(user: &AuthenticatedUser) -> Result<(), GatewayError> {
    if user.role != "admin" {
        return Err(GatewayError::forbidden("admin role required"));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct CreateCookieBody {
    pub platform: String,
    #[serde(default)]
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub expire_at: String,
    #[serde(default)]
    pub freeze_seconds: i64,
}

pub async fn create_cookie(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CreateCookieBody>,
) -> Result<HttpResponse, GatewayError> {
    let user = authenticated_user(&req)?;
    require_admin(&user)?;

    let mut asset = state.clients.asset.clone();
    let resp = with_deadline(
        state.config.grpc.timeout_secs,
        "asset",
        asset.create_cookie(CreateCookieRequest {
            platform: body.platform.clone(),
            name: body.name.clone(),
            content: body.content.clone(),
            expire_at: body.expire_at.clone(),
            freeze_seconds: body.freeze_seconds,
        }),
    )
    .await?;

    Ok(HttpResponse::Created().json(json!({ "cookie_id": resp.cookie_id })))
}

#[derive(Debug, Deserialize)]
pub struct ListCookiesQuery {
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub page: i32,
    #[serde(default)]
    pub page_size: i32,
}

pub async fn list_cookies(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<ListCookiesQuery>,
) -> Result<HttpResponse, GatewayError> {
    let user = authenticated_user(&req)?;
    require_admin(&user)?;

    let mut asset = state.clients.asset.clone();
    let resp = with_deadline(
        state.config.grpc.timeout_secs,
        "asset",
        asset.list_cookies(ListCookiesRequest {
            platform: query.platform.clone(),
            status: query.status.clone(),
            page: query.page,
            page_size: query.page_size,
        }),
    )
    .await?;

    let items: Vec<_> = resp
        .items
        .iter()
        .map(|c| {
            json!({
                "id": c.id,
                "platform": c.platform,
                "name": c.name,
                "status": c.status,
                "expire_at": c.expire_at,
                "frozen_until": c.frozen_until,
                "freeze_seconds": c.freeze_seconds,
                "use_count": c.use_count,
                "success_count": c.success_count,
                "fail_count": c.fail_count,
                "last_used_at": c.last_used_at,
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({ "total": resp.total, "items": items })))
}

pub async fn delete_cookie(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse, GatewayError> {
    let user = authenticated_user(&req)?;
    require_admin(&user)?;

    let mut asset = state.clients.asset.clone();
    with_deadline(
        state.config.grpc.timeout_secs,
        "asset",
        asset.delete_cookie(DeleteCookieRequest {
            cookie_id: path.into_inner(),
        }),
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct FreezeCookieBody {
    pub freeze_seconds: i64,
}

pub async fn freeze_cookie(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<FreezeCookieBody>,
) -> Result<HttpResponse, GatewayError> {
    let user = authenticated_user(&req)?;
    require_admin(&user)?;

    let mut asset = state.clients.asset.clone();
    let resp = with_deadline(
        state.config.grpc.timeout_secs,
        "asset",
        asset.freeze_cookie(FreezeCookieRequest {
            cookie_id: path.into_inner(),
            freeze_seconds: body.freeze_seconds,
        }),
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({ "frozen_until": resp.frozen_until })))
}
