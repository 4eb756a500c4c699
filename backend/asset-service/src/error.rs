use thiserror::Error;
use vget_common::ServiceError;

pub type Result<T> = std::result::Result<T, AssetError>;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("daily quota exceeded")]
    QuotaExhausted,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("no available {0}")]
    NoneAvailable(&'static str),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("health check failed: {0}")]
    HealthCheck(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<AssetError> for tonic::Status {
    fn from(err: AssetError) -> Self {
        let service_err = match err {
            AssetError::QuotaExhausted => ServiceError::QuotaExhausted("daily quota exceeded".into()),
            AssetError::NotFound(what) => ServiceError::NotFound(what.to_string()),
            AssetError::NoneAvailable(what) => {
                ServiceError::ResourceUnavailable(format!("no available {what}"))
            }
            AssetError::InvalidInput(msg) => ServiceError::InvalidInput(msg),
            AssetError::PreconditionFailed(msg) => ServiceError::PreconditionFailed(msg),
            AssetError::Database(e) => ServiceError::Internal(format!("database error: {e}")),
            AssetError::HealthCheck(msg) => ServiceError::ResourceUnavailable(msg),
            AssetError::Internal(msg) => ServiceError::Internal(msg),
        };
        service_err.into()
    }
}
