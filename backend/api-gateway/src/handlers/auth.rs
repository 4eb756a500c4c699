//! Account endpoints: register, login, logout, profile, password.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use grpc_clients::vget::auth::v1::*;

use crate::error::GatewayError;
use crate::handlers::with_deadline;
use crate::middleware::auth::authenticated_user;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub nickname: String,
}

pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterBody>,
) -> Result<HttpResponse, GatewayError> {
    let mut client = state.clients.auth.clone();
    let resp = with_deadline(
        state.config.grpc.timeout_secs,
        "auth",
        client.register(RegisterRequest {
            email: body.email.clone(),
            password: body.password.clone(),
            nickname: body.nickname.clone(),
        }),
    )
    .await?;

    Ok(HttpResponse::Created().json(json!({
        "user_id": resp.user_id,
        "email": resp.email,
        "nickname": resp.nickname,
    })))
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

pub async fn login(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<LoginBody>,
) -> Result<HttpResponse, GatewayError> {
    let device_info = req
        .headers()
        .get("User-Agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let ip_address = req
        .connection_info()
        .realip_remote_addr()
        .unwrap_or_default()
        .to_string();

    let mut client = state.clients.auth.clone();
    let resp = with_deadline(
        state.config.grpc.timeout_secs,
        "auth",
        client.login(LoginRequest {
            email: body.email.clone(),
            password: body.password.clone(),
            device_info,
            ip_address,
        }),
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "access_token": resp.access_token,
        "refresh_token": resp.refresh_token,
        "expires_in": resp.expires_in,
        "user": {
            "user_id": resp.user_id,
            "email": resp.email,
            "nickname": resp.nickname,
            "role": resp.role,
        },
    })))
}

pub async fn logout(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, GatewayError> {
    let user = authenticated_user(&req)?;

    let mut client = state.clients.auth.clone();
    with_deadline(
        state.config.grpc.timeout_secs,
        "auth",
        client.logout(LogoutRequest { token: user.token }),
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

pub async fn get_profile(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, GatewayError> {
    let user = authenticated_user(&req)?;

    let mut client = state.clients.auth.clone();
    let resp = with_deadline(
        state.config.grpc.timeout_secs,
        "auth",
        client.get_user_info(GetUserInfoRequest {
            user_id: user.user_id,
        }),
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "user_id": resp.user_id,
        "email": resp.email,
        "nickname": resp.nickname,
        "role": resp.role,
        "status": resp.status,
        "created_at": resp.created_at,
    })))
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileBody {
    pub nickname: String,
}

pub async fn update_profile(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<UpdateProfileBody>,
) -> Result<HttpResponse, GatewayError> {
    let user = authenticated_user(&req)?;

    let mut client = state.clients.auth.clone();
    let resp = with_deadline(
        state.config.grpc.timeout_secs,
        "auth",
        client.update_profile(UpdateProfileRequest {
            user_id: user.user_id,
            nickname: body.nickname.clone(),
        }),
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "user_id": resp.user_id,
        "nickname": resp.nickname,
    })))
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordBody {
    pub old_password: String,
    pub new_password: String,
}

pub async fn change_password(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<ChangePasswordBody>,
) -> Result<HttpResponse, GatewayError> {
    let user = authenticated_user(&req)?;

    let mut client = state.clients.auth.clone();
    with_deadline(
        state.config.grpc.timeout_secs,
        "auth",
        client.change_password(ChangePasswordRequest {
            user_id: user.user_id,
            old_password: body.old_password.clone(),
            new_password: body.new_password.clone(),
        }),
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}
