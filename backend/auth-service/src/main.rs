//! vget Auth Service - main entry point.

use redis::aio::ConnectionManager;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::time::Duration;
use tonic::transport::Server;

use auth_service::config::Config;
use auth_service::db::session_repo;
use auth_service::grpc::AuthServiceImpl;
use auth_service::AppState;
use grpc_clients::vget::auth::v1::auth_service_server::AuthServiceServer;
use grpc_clients::MAX_MESSAGE_SIZE;
use vget_common::config::config_path;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::load(&config_path("config/auth-service.yaml"))?;

    tracing::info!(
        "Starting vget Auth Service on {}:{}",
        config.server.host,
        config.server.port
    );

    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url())
        .await?;
    tracing::info!("Database connection pool initialized");

    let redis_client = redis::Client::open(config.redis.url.clone())?;
    let redis_conn = ConnectionManager::new(redis_client).await?;
    tracing::info!("Redis connection initialized");

    let state = AppState {
        db: db_pool.clone(),
        redis: redis_conn,
        config: config.clone(),
    };

    // Background reap of expired sessions.
    let reap_interval = Duration::from_secs(config.session.reap_interval_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(reap_interval);
        loop {
            ticker.tick().await;
            match session_repo::delete_expired(&db_pool).await {
                Ok(0) => {}
                Ok(n) => tracing::info!(reaped = n, "expired sessions removed"),
                Err(e) => tracing::warn!(error = %e, "session reap failed"),
            }
        }
    });

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let service = AuthServiceServer::new(AuthServiceImpl::new(state))
        .max_decoding_message_size(MAX_MESSAGE_SIZE);

    tracing::info!("gRPC server listening on {}", addr);
    Server::builder().add_service(service).serve(addr).await?;

    Ok(())
}
