//! vget Parser Service - main entry point.

use redis::aio::ConnectionManager;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tonic::transport::Server;

use grpc_clients::vget::parser::v1::parser_service_server::ParserServiceServer;
use grpc_clients::MAX_MESSAGE_SIZE;
use parser_service::asset_client::AssetClient;
use parser_service::cache::CacheService;
use parser_service::config::Config;
use parser_service::grpc::ParserServiceImpl;
use parser_service::service::ParserService;
use vget_common::config::config_path;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::load(&config_path("config/parser-service.yaml"))?;

    tracing::info!(
        "Starting vget Parser Service on {}:{}",
        config.server.host,
        config.server.port
    );

    let redis_client = redis::Client::open(config.redis.url.clone())?;
    let redis_conn = ConnectionManager::new(redis_client).await?;
    tracing::info!("Redis connection initialized");

    let cache = CacheService::new(redis_conn, Duration::from_secs(config.cache.ttl_secs));

    let asset_client = if config.asset_service.addr.is_empty() {
        tracing::warn!("asset service not configured, cookies and proxies disabled");
        None
    } else {
        match AssetClient::connect(
            &config.asset_service.addr,
            &config.asset_service.cookie_temp_dir,
        )
        .await
        {
            Ok(client) => {
                tracing::info!(addr = %config.asset_service.addr, "asset client connected");
                Some(client)
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to connect asset service, continuing without");
                None
            }
        }
    };

    let service = Arc::new(ParserService::new(&config, cache, asset_client));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let grpc_service = ParserServiceServer::new(ParserServiceImpl::new(service))
        .max_decoding_message_size(MAX_MESSAGE_SIZE);

    tracing::info!("gRPC server listening on {}", addr);
    Server::builder().add_service(grpc_service).serve(addr).await?;

    Ok(())
}
