//! vget API Gateway - main entry point.

use actix_web::{web, App, HttpServer};
use redis::aio::ConnectionManager;
use std::sync::Arc;
use std::time::Duration;

use api_gateway::config::Config;
use api_gateway::middleware::{RateLimiters, RequestIdMiddleware};
use api_gateway::{routes, AppState};
use grpc_clients::GrpcClients;
use task_queue::TaskPublisher;
use vget_common::config::config_path;

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::load(&config_path("config/api-gateway.yaml"))?;

    tracing::info!(
        "Starting vget API Gateway on {}:{}",
        config.server.host,
        config.server.port
    );

    let redis_client = redis::Client::open(config.redis.url.clone())?;
    let redis_conn = ConnectionManager::new(redis_client).await?;
    tracing::info!("Redis connection initialized");

    let clients = GrpcClients::connect(
        &config.grpc.auth_addr,
        &config.grpc.parser_addr,
        &config.grpc.asset_addr,
    )
    .await?;
    tracing::info!("gRPC clients connected");

    let publisher = Arc::new(TaskPublisher::connect(config.rabbitmq.clone()).await?);
    tracing::info!("Task publisher connected");

    let limiters = RateLimiters::new(&config.rate_limit);

    let state = AppState {
        clients,
        redis: redis_conn,
        redis_url: config.redis.url.clone(),
        publisher,
        config: config.clone(),
    };

    let bind_addr = (config.server.host.as_str(), config.server.port);
    let client_timeout = Duration::from_secs(config.server.client_timeout_secs);

    HttpServer::new(move || {
        let state = state.clone();
        let limiters = limiters.clone();
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(RequestIdMiddleware)
            .configure(move |cfg| routes::configure(cfg, &state, &limiters))
    })
    .client_request_timeout(client_timeout)
    .shutdown_timeout(10)
    .bind(bind_addr)?
    .run()
    .await?;

    Ok(())
}
