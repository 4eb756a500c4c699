//! Bearer-token auth middleware.
//!
//! Checks the shared Redis claims cache first, falling back to an
//! AuthService VerifyToken call whose result is cached for five minutes.

use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, HttpMessage, HttpRequest};
use futures_util::future::LocalBoxFuture;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::future::{ready, Ready};
use std::rc::Rc;

use grpc_clients::vget::auth::v1::VerifyTokenRequest;
use grpc_clients::GrpcClients;

use crate::error::GatewayError;

const TOKEN_CACHE_TTL_SECS: i64 = 300;

/// Authenticated identity inserted into request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: String,
    pub role: String,
    pub token: String,
}

/// Read the authenticated identity injected by `AuthMiddleware`.
pub fn authenticated_user(req: &HttpRequest) -> Result<AuthenticatedUser, GatewayError> {
    req.extensions()
        .get::<AuthenticatedUser>()
        .cloned()
        .ok_or_else(|| GatewayError::unauthenticated("user not authenticated"))
}

pub fn token_cache_key(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("auth:token:{}", hex::encode(hasher.finalize()))
}

/// Resolve a bearer token to an identity via cache-then-RPC. Shared by
/// the HTTP middleware and the WebSocket upgrade (which carries its
/// token in a query parameter).
pub async fn resolve_token(
    redis: &ConnectionManager,
    clients: &GrpcClients,
    token: &str,
) -> Result<AuthenticatedUser, GatewayError> {
    if token.is_empty() {
        return Err(GatewayError::unauthenticated("empty token"));
    }

    let cache_key = token_cache_key(token);
    let mut conn = redis.clone();

    if let Ok(cached) = conn.hgetall::<_, HashMap<String, String>>(&cache_key).await {
        if let Some(user_id) = cached.get("user_id").filter(|v| !v.is_empty()) {
            return Ok(AuthenticatedUser {
                user_id: user_id.clone(),
                email: cached.get("email").cloned().unwrap_or_default(),
                role: cached.get("role").cloned().unwrap_or_default(),
                token: token.to_string(),
            });
        }
    }

    let mut auth = clients.auth.clone();
    let resp = auth
        .verify_token(VerifyTokenRequest {
            token: token.to_string(),
        })
        .await
        .map_err(|_| GatewayError::unauthenticated("token verification failed"))?
        .into_inner();

    if !resp.valid {
        return Err(GatewayError::unauthenticated("invalid token"));
    }

    let fields = [
        ("user_id", resp.user_id.as_str()),
        ("email", resp.email.as_str()),
        ("role", resp.role.as_str()),
    ];
    let _: redis::RedisResult<()> = async {
        conn.hset_multiple::<_, _, _, ()>(&cache_key, &fields).await?;
        conn.expire::<_, ()>(&cache_key, TOKEN_CACHE_TTL_SECS).await?;
        Ok(())
    }
    .await;

    Ok(AuthenticatedUser {
        user_id: resp.user_id,
        email: resp.email,
        role: resp.role,
        token: token.to_string(),
    })
}

pub struct AuthMiddleware {
    redis: ConnectionManager,
    clients: GrpcClients,
}

impl AuthMiddleware {
    pub fn new(redis: ConnectionManager, clients: GrpcClients) -> Self {
        Self { redis, clients }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
            redis: self.redis.clone(),
            clients: self.clients.clone(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    redis: ConnectionManager,
    clients: GrpcClients,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let redis = self.redis.clone();
        let clients = self.clients.clone();

        Box::pin(async move {
            let header = req
                .headers()
                .get("Authorization")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();

            let token = header.strip_prefix("Bearer ").unwrap_or_default();
            let user = resolve_token(&redis, &clients, token).await?;

            req.extensions_mut().insert(user);
            service.call(req).await
        })
    }
}
