//! Worker error taxonomy. Every failure here marks the history row
//! failed and nacks the delivery back to the broker.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("insufficient disk space")]
    InsufficientSpace,

    #[error("download timeout after {0}s")]
    Timeout(u64),

    #[error("proxy unavailable: {0}")]
    ProxyUnavailable(String),

    #[error("extractor failed: {0}")]
    Extractor(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}
