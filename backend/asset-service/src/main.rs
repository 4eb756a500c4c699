//! vget Asset Service - main entry point.

use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use tonic::transport::Server;

use asset_service::config::Config;
use asset_service::grpc::AssetServiceImpl;
use asset_service::AppState;
use grpc_clients::vget::asset::v1::asset_service_server::AssetServiceServer;
use grpc_clients::MAX_MESSAGE_SIZE;
use vget_common::config::config_path;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::load(&config_path("config/asset-service.yaml"))?;

    tracing::info!(
        "Starting vget Asset Service on {}:{}",
        config.server.host,
        config.server.port
    );

    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url())
        .await?;

    tracing::info!("Database connection pool initialized");

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let state = AppState {
        db: db_pool,
        config,
    };

    let service = AssetServiceServer::new(AssetServiceImpl::new(state))
        .max_decoding_message_size(MAX_MESSAGE_SIZE);

    tracing::info!("gRPC server listening on {}", addr);
    Server::builder().add_service(service).serve(addr).await?;

    Ok(())
}
