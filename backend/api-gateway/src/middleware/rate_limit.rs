//! Layered rate admission.
//!
//! A process-global token bucket (global RPS, burst 2x) in front of
//! per-identity buckets: authenticated user id on protected routes,
//! client ip on public routes. Rejection never reaches downstream
//! services.

use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, HttpMessage};
use futures_util::future::LocalBoxFuture;
use governor::{DefaultDirectRateLimiter, DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::future::{ready, Ready};
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::config::RateLimitConfig;
use crate::middleware::auth::AuthenticatedUser;

/// Shared limiter state; one per process, cloned into every scope.
#[derive(Clone)]
pub struct RateLimiters {
    global: Arc<DefaultDirectRateLimiter>,
    per_identity: Arc<DefaultKeyedRateLimiter<String>>,
}

fn nonzero(v: u32) -> NonZeroU32 {
    NonZeroU32::new(v.max(1)).expect("clamped to at least 1")
}

impl RateLimiters {
    pub fn new(cfg: &RateLimitConfig) -> Self {
        let global_quota =
            Quota::per_second(nonzero(cfg.global_rps)).allow_burst(nonzero(cfg.burst * 2));
        let identity_quota =
            Quota::per_second(nonzero(cfg.user_rps)).allow_burst(nonzero(cfg.burst));

        Self {
            global: Arc::new(RateLimiter::direct(global_quota)),
            per_identity: Arc::new(RateLimiter::keyed(identity_quota)),
        }
    }

    pub fn check_global(&self) -> bool {
        self.global.check().is_ok()
    }

    pub fn check_identity(&self, key: &str) -> bool {
        self.per_identity.check_key(&key.to_string()).is_ok()
    }
}

/// Which identity keys the per-identity bucket.
#[derive(Clone, Copy)]
enum IdentityMode {
    User,
    Ip,
}

#[derive(Clone)]
pub struct RateLimitMiddleware {
    limiters: RateLimiters,
    mode: IdentityMode,
}

impl RateLimitMiddleware {
    /// Protected routes: keyed by authenticated user id.
    pub fn by_user(limiters: RateLimiters) -> Self {
        Self {
            limiters,
            mode: IdentityMode::User,
        }
    }

    /// Public routes: keyed by client ip.
    pub fn by_ip(limiters: RateLimiters) -> Self {
        Self {
            limiters,
            mode: IdentityMode::Ip,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RateLimitMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddlewareService {
            service,
            limiters: self.limiters.clone(),
            mode: self.mode,
        }))
    }
}

pub struct RateLimitMiddlewareService<S> {
    service: S,
    limiters: RateLimiters,
    mode: IdentityMode,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
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
        // Rate rejection is a 429, distinct from the quota 403.
        let too_many = |msg: &str| actix_web::error::ErrorTooManyRequests(msg.to_string());

        if !self.limiters.check_global() {
            let err = too_many("global rate limit exceeded, please try again later");
            return Box::pin(async move { Err(err) });
        }

        let key = match self.mode {
            IdentityMode::User => req
                .extensions()
                .get::<AuthenticatedUser>()
                .map(|u| format!("user:{}", u.user_id)),
            IdentityMode::Ip => req
                .connection_info()
                .realip_remote_addr()
                .map(|ip| format!("ip:{ip}")),
        };

        if let Some(key) = key {
            if !self.limiters.check_identity(&key) {
                let err = too_many("rate limit exceeded, please try again later");
                return Box::pin(async move { Err(err) });
            }
        }

        let fut = self.service.call(req);
        Box::pin(fut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiters(global_rps: u32, user_rps: u32, burst: u32) -> RateLimiters {
        RateLimiters::new(&RateLimitConfig {
            global_rps,
            user_rps,
            burst,
        })
    }

    #[test]
    fn global_bucket_allows_double_burst() {
        let l = limiters(1, 100, 3);
        // burst * 2 = 6 immediate permits
        let allowed = (0..10).filter(|_| l.check_global()).count();
        assert_eq!(allowed, 6);
    }

    #[test]
    fn identity_buckets_are_independent() {
        let l = limiters(1000, 1, 2);
        let a_allowed = (0..5).filter(|_| l.check_identity("user:a")).count();
        let b_allowed = (0..5).filter(|_| l.check_identity("user:b")).count();
        assert_eq!(a_allowed, 2);
        assert_eq!(b_allowed, 2);
    }
}
