//! vget Asset Service
//!
//! Owns the mutable shared state of the mesh behind transactional
//! guarantees:
//! - platform cookies with freeze/cooldown accounting
//! - egress proxies with health probing and usage counters
//! - per-user daily quotas (row-locked check/consume)
//! - durable download history and user statistics
//!
//! Exposed to the rest of the mesh as a gRPC service.

pub mod config;
pub mod db;
pub mod error;
pub mod grpc;
pub mod models;
pub mod services;

pub use error::{AssetError, Result};

use sqlx::PgPool;

/// Shared state for the gRPC handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: config::Config,
}
