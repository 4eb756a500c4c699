//! Unified error handling for all vget services
//!
//! Provides consistent error types that work across service boundaries.
//! Every boundary speaks this taxonomy: gateway handlers map it to HTTP
//! status codes, gRPC servers map it to `tonic::Status`, and clients map
//! `tonic::Status` back into it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for vget services
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Unified error type for inter-service communication
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "error_type", content = "details")]
pub enum ServiceError {
    /// Malformed or rejected input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Missing or invalid credentials
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Authenticated but not allowed
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Daily quota exhausted
    #[error("Quota exhausted: {0}")]
    QuotaExhausted(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict with existing state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Operation requires a state the target is not in
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// No cookie / proxy / disk space available
    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// Upstream extraction timed out
    #[error("Upstream timeout: {0}")]
    UpstreamTimeout(String),

    /// Upstream extraction failed terminally
    #[error("Upstream failed: {0}")]
    UpstreamFailed(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::Unauthenticated(_) => 401,
            Self::PermissionDenied(_) => 403,
            Self::QuotaExhausted(_) => 403,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::PreconditionFailed(_) => 412,
            Self::ResourceUnavailable(_) => 503,
            Self::UpstreamTimeout(_) => 504,
            Self::UpstreamFailed(_) => 502,
            Self::Internal(_) => 500,
        }
    }

    /// Check if this error class is worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ResourceUnavailable(_) | Self::UpstreamTimeout(_)
        )
    }
}

impl From<anyhow::Error> for ServiceError {
    fn from(err: anyhow::Error) -> Self {
        ServiceError::Internal(err.to_string())
    }
}

impl From<ServiceError> for tonic::Status {
    fn from(err: ServiceError) -> Self {
        let msg = err.to_string();
        match err {
            ServiceError::InvalidInput(_) => tonic::Status::invalid_argument(msg),
            ServiceError::Unauthenticated(_) => tonic::Status::unauthenticated(msg),
            ServiceError::PermissionDenied(_) => tonic::Status::permission_denied(msg),
            ServiceError::QuotaExhausted(_) => tonic::Status::resource_exhausted(msg),
            ServiceError::NotFound(_) => tonic::Status::not_found(msg),
            ServiceError::Conflict(_) => tonic::Status::already_exists(msg),
            ServiceError::PreconditionFailed(_) => tonic::Status::failed_precondition(msg),
            ServiceError::ResourceUnavailable(_) => tonic::Status::unavailable(msg),
            ServiceError::UpstreamTimeout(_) => tonic::Status::deadline_exceeded(msg),
            ServiceError::UpstreamFailed(_) => tonic::Status::aborted(msg),
            ServiceError::Internal(_) => tonic::Status::internal(msg),
        }
    }
}

impl From<tonic::Status> for ServiceError {
    fn from(status: tonic::Status) -> Self {
        let msg = status.message().to_string();
        match status.code() {
            tonic::Code::InvalidArgument => ServiceError::InvalidInput(msg),
            tonic::Code::Unauthenticated => ServiceError::Unauthenticated(msg),
            tonic::Code::PermissionDenied => ServiceError::PermissionDenied(msg),
            tonic::Code::ResourceExhausted => ServiceError::QuotaExhausted(msg),
            tonic::Code::NotFound => ServiceError::NotFound(msg),
            tonic::Code::AlreadyExists => ServiceError::Conflict(msg),
            tonic::Code::FailedPrecondition => ServiceError::PreconditionFailed(msg),
            tonic::Code::Unavailable => ServiceError::ResourceUnavailable(msg),
            tonic::Code::DeadlineExceeded => ServiceError::UpstreamTimeout(msg),
            tonic::Code::Aborted => ServiceError::UpstreamFailed(msg),
            _ => ServiceError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(ServiceError::InvalidInput("x".into()).status_code(), 400);
        assert_eq!(ServiceError::QuotaExhausted("x".into()).status_code(), 403);
        assert_eq!(ServiceError::NotFound("x".into()).status_code(), 404);
        assert_eq!(ServiceError::UpstreamTimeout("x".into()).status_code(), 504);
        assert_eq!(ServiceError::Internal("x".into()).status_code(), 500);
    }

    #[test]
    fn grpc_round_trip_preserves_kind() {
        let err = ServiceError::QuotaExhausted("daily quota exceeded".into());
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::ResourceExhausted);
        let back: ServiceError = status.into();
        assert!(matches!(back, ServiceError::QuotaExhausted(_)));
    }

    #[test]
    fn only_transient_kinds_are_retryable() {
        assert!(ServiceError::UpstreamTimeout("t".into()).is_retryable());
        assert!(ServiceError::ResourceUnavailable("p".into()).is_retryable());
        assert!(!ServiceError::UpstreamFailed("f".into()).is_retryable());
        assert!(!ServiceError::NotFound("n".into()).is_retryable());
    }
}
