//! vget Auth Service
//!
//! Users, sessions and tokens for the mesh:
//! - registration and login with bcrypt password hashing
//! - HS256 access/refresh token pairs
//! - per-user session cap with oldest-eviction
//! - Redis-backed token claims cache shared with the gateway
//! - background reaping of expired sessions

pub mod config;
pub mod db;
pub mod error;
pub mod grpc;
pub mod models;
pub mod security;
pub mod services;

pub use error::{AuthError, Result};

use redis::aio::ConnectionManager;
use sqlx::PgPool;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub redis: ConnectionManager,
    pub config: config::Config,
}
