//! vget Downloader Service - main entry point.

use redis::aio::ConnectionManager;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tonic::transport::Server;

use downloader_service::asset_client::AssetClient;
use downloader_service::config::Config;
use downloader_service::consumer::ConsumerLoop;
use downloader_service::grpc::DownloaderServiceImpl;
use downloader_service::pool::{WorkerContext, WorkerPool};
use downloader_service::progress::ProgressPublisher;
use downloader_service::proxy::ProxyProvider;
use downloader_service::reaper::Reaper;
use downloader_service::ytdlp::Executor;
use grpc_clients::vget::downloader::v1::downloader_service_server::DownloaderServiceServer;
use grpc_clients::MAX_MESSAGE_SIZE;
use vget_common::config::config_path;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::load(&config_path("config/downloader-service.yaml"))?;

    tracing::info!(
        "Starting vget Downloader Service (pool_size={}, max_concurrent={})",
        config.worker.pool_size,
        config.worker.max_concurrent
    );

    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url())
        .await?;
    tracing::info!("Database connection pool initialized");

    let redis_client = redis::Client::open(config.redis.url.clone())?;
    let redis_conn = ConnectionManager::new(redis_client).await?;
    tracing::info!("Redis connection initialized");

    let asset_client = if config.asset_service.addr.is_empty() {
        tracing::warn!("asset service not configured, cookie reuse disabled");
        None
    } else {
        match AssetClient::connect(&config.asset_service.addr, &config.ytdlp.cookie_temp_dir).await
        {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "failed to connect asset service, continuing without");
                None
            }
        }
    };

    let proxy_provider = ProxyProvider::new(
        asset_client.as_ref().map(|c| c.grpc()),
        config.proxy_api.clone(),
        config.retry.clone(),
    );

    let ctx = Arc::new(WorkerContext {
        db: db_pool.clone(),
        executor: Executor::new(config.ytdlp.clone()),
        publisher: ProgressPublisher::new(redis_conn),
        proxy_provider,
        asset_client,
        storage: config.storage.clone(),
        retry: config.retry.clone(),
    });

    let pool = Arc::new(WorkerPool::start(
        config.worker.pool_size,
        config.worker.max_concurrent,
        ctx,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Reaper.
    let reaper = Reaper::new(&config.cleanup, db_pool.clone());
    let reaper_shutdown = shutdown_rx.clone();
    let reaper_handle = tokio::spawn(async move {
        reaper.run(reaper_shutdown).await;
    });

    // Task-status RPC.
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let grpc_service = DownloaderServiceServer::new(DownloaderServiceImpl::new(db_pool.clone()))
        .max_decoding_message_size(MAX_MESSAGE_SIZE);
    let mut grpc_shutdown = shutdown_rx.clone();
    let grpc_handle = tokio::spawn(async move {
        tracing::info!("gRPC server listening on {}", addr);
        let result = Server::builder()
            .add_service(grpc_service)
            .serve_with_shutdown(addr, async {
                let _ = grpc_shutdown.changed().await;
            })
            .await;
        if let Err(e) = result {
            tracing::error!(error = %e, "gRPC server error");
        }
    });

    // Broker consumer.
    let consumer = ConsumerLoop::connect(config.rabbitmq.clone()).await?;
    let consumer_pool = pool.clone();
    let consumer_shutdown = shutdown_rx.clone();
    let consumer_handle = tokio::spawn(async move {
        if let Err(e) = consumer.run(consumer_pool, consumer_shutdown).await {
            tracing::error!(error = %e, "consumer error");
        }
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    // Stop intake first, then let in-flight tasks finish within the
    // grace period.
    let _ = tokio::time::timeout(SHUTDOWN_GRACE, consumer_handle).await;
    match Arc::try_unwrap(pool) {
        Ok(pool) => {
            let _ = tokio::time::timeout(SHUTDOWN_GRACE, pool.shutdown()).await;
        }
        Err(_) => tracing::warn!("worker pool still shared at shutdown, skipping drain"),
    }
    let _ = tokio::time::timeout(SHUTDOWN_GRACE, reaper_handle).await;
    let _ = tokio::time::timeout(SHUTDOWN_GRACE, grpc_handle).await;

    tracing::info!("downloader service stopped");
    Ok(())
}
