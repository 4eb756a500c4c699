//! Route table.
//!
//! Registration order matters: actix matches services in order, and a
//! scope that matches a prefix does not fall through. Public resources
//! and the socket route are registered before the protected `/api/v1`
//! scope so the scope cannot swallow them.

use actix_web::web;

use crate::handlers::{auth, cookie, download, file, health, history, parse, proxy};
use crate::middleware::{AuthMiddleware, RateLimitMiddleware, RateLimiters};
use crate::ws;
use crate::AppState;

pub fn configure(cfg: &mut web::ServiceConfig, state: &AppState, limiters: &RateLimiters) {
    // Health probes bypass admission.
    cfg.route("/health", web::get().to(health::health))
        .route("/ready", web::get().to(health::ready))
        .route("/live", web::get().to(health::live))
        .route("/version", web::get().to(health::version));

    // Public routes, keyed by client ip.
    cfg.service(
        web::resource("/api/v1/auth/register")
            .wrap(RateLimitMiddleware::by_ip(limiters.clone()))
            .route(web::post().to(auth::register)),
    );
    cfg.service(
        web::resource("/api/v1/auth/login")
            .wrap(RateLimitMiddleware::by_ip(limiters.clone()))
            .route(web::post().to(auth::login)),
    );

    // Progress sockets authenticate via query parameter inside the
    // handler.
    cfg.route("/api/v1/ws/progress", web::get().to(ws::progress_socket));

    // Protected routes. The outermost wrap runs first, so register the
    // per-user rate limiter first and auth last.
    cfg.service(
        web::scope("/api/v1")
            .wrap(RateLimitMiddleware::by_user(limiters.clone()))
            .wrap(AuthMiddleware::new(
                state.redis.clone(),
                state.clients.clone(),
            ))
            .route("/auth/logout", web::post().to(auth::logout))
            .route("/auth/profile", web::get().to(auth::get_profile))
            .route("/auth/profile", web::put().to(auth::update_profile))
            .route("/auth/password", web::put().to(auth::change_password))
            .route("/parse", web::post().to(parse::parse_url))
            .route("/download", web::post().to(download::submit_download))
            .route("/download/file", web::get().to(file::download_file))
            .route("/user/history", web::get().to(history::get_history))
            .route("/user/history/{id}", web::delete().to(history::delete_history))
            .route("/user/quota", web::get().to(history::get_quota))
            .route("/user/stats", web::get().to(history::get_stats))
            .service(
                web::scope("/admin")
                    .route("/cookies", web::post().to(cookie::create_cookie))
                    .route("/cookies", web::get().to(cookie::list_cookies))
                    .route("/cookies/{id}", web::delete().to(cookie::delete_cookie))
                    .route("/cookies/{id}/freeze", web::post().to(cookie::freeze_cookie))
                    .route("/proxies", web::post().to(proxy::create_proxy))
                    .route("/proxies", web::get().to(proxy::list_proxies))
                    .route("/proxies/{id}", web::delete().to(proxy::delete_proxy))
                    .route("/proxies/{id}/check", web::post().to(proxy::check_proxy_health)),
            ),
    );
}
