//! vget API Gateway
//!
//! Terminates client connections. After auth and rate admission it
//! orchestrates the submission protocol (quota -> validate -> parse ->
//! persist -> enqueue) against the downstream mesh and hosts the
//! progress-stream sockets.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod ws;

pub use error::GatewayError;

use std::sync::Arc;

use grpc_clients::GrpcClients;
use redis::aio::ConnectionManager;
use task_queue::TaskPublisher;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub clients: GrpcClients,
    pub redis: ConnectionManager,
    /// Raw URL kept for dedicated pub/sub connections; the manager
    /// multiplexes commands but subscriptions need their own socket.
    pub redis_url: String,
    pub publisher: Arc<TaskPublisher>,
    pub config: config::Config,
}
