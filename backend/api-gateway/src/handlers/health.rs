//! Service-health probes.

use actix_web::{web, HttpResponse, Responder};
use serde_json::json;

use crate::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub async fn health(state: web::Data<AppState>) -> impl Responder {
    let mq_connected = state.publisher.is_connected().await;
    let status = if mq_connected { "ok" } else { "degraded" };

    let mut response = if mq_connected {
        HttpResponse::Ok()
    } else {
        HttpResponse::ServiceUnavailable()
    };
    response.json(json!({
        "status": status,
        "mq_connected": mq_connected,
        "version": VERSION,
    }))
}

pub async fn ready() -> impl Responder {
    HttpResponse::Ok().body("READY")
}

pub async fn live() -> impl Responder {
    HttpResponse::Ok().body("OK")
}

pub async fn version() -> impl Responder {
    HttpResponse::Ok().json(json!({ "version": VERSION }))
}
