//! Admin management of the proxy pool.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use grpc_clients::vget::asset::v1::*;

use crate::error::GatewayError;
use crate::handlers::cookie::require_admin;
use crate::handlers::with_deadline;
use crate::middleware::auth::authenticated_user;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateProxyBody {
    pub host: String,
    pub port: i32,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub check_health: bool,
}

pub async fn create_proxy(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CreateProxyBody>,
) -> Result<HttpResponse, GatewayError> {
    let user = authenticated_user(&req)?;
    require_admin(&user)?;

    let mut asset = state.clients.asset.clone();
    let resp = with_deadline(
        state.config.grpc.timeout_secs,
        "asset",
        asset.create_proxy(CreateProxyRequest {
            host: body.host.clone(),
            port: body.port,
            username: body.username.clone(),
            password: body.password.clone(),
            protocol: body.protocol.clone(),
            region: body.region.clone(),
            check_health: body.check_health,
        }),
    )
    .await?;

    Ok(HttpResponse::Created().json(json!({
        "proxy_id": resp.proxy_id,
        "health_check_passed": resp.health_check_passed,
        "health_check_error": resp.health_check_error,
    })))
}

#[derive(Debug, Deserialize)]
pub struct ListProxiesQuery {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub page: i32,
    #[serde(default)]
    pub page_size: i32,
}

pub async fn list_proxies(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<ListProxiesQuery>,
) -> Result<HttpResponse, GatewayError> {
    let user = authenticated_user(&req)?;
    require_admin(&user)?;

    let mut asset = state.clients.asset.clone();
    let resp = with_deadline(
        state.config.grpc.timeout_secs,
        "asset",
        asset.list_proxies(ListProxiesRequest {
            status: query.status.clone(),
            protocol: query.protocol.clone(),
            region: query.region.clone(),
            page: query.page,
            page_size: query.page_size,
        }),
    )
    .await?;

    let items: Vec<_> = resp
        .items
        .iter()
        .map(|p| {
            json!({
                "id": p.id,
                "host": p.host,
                "port": p.port,
                "protocol": p.protocol,
                "region": p.region,
                "status": p.status,
                "last_check_at": p.last_check_at,
                "last_check_result": p.last_check_result,
                "success_count": p.success_count,
                "fail_count": p.fail_count,
                "last_used_at": p.last_used_at,
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({ "total": resp.total, "items": items })))
}

pub async fn delete_proxy(
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
        asset.delete_proxy(DeleteProxyRequest {
            proxy_id: path.into_inner(),
        }),
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

pub async fn check_proxy_health(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse, GatewayError> {
    let user = authenticated_user(&req)?;
    require_admin(&user)?;

    let mut asset = state.clients.asset.clone();
    let resp = with_deadline(
        state.config.grpc.timeout_secs,
        "asset",
        asset.check_proxy_health(CheckProxyHealthRequest {
            proxy_id: path.into_inner(),
        }),
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "healthy": resp.healthy,
        "latency_ms": resp.latency_ms,
        "message": resp.message,
    })))
}
