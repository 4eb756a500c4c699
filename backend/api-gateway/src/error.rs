//! HTTP error mapping. Handlers never synthesize errors they do not
//! understand: gRPC codes map onto the shared taxonomy and everything
//! unclassifiable becomes a 500.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;
use vget_common::ServiceError;

#[derive(Debug, Error)]
#[error("{service_error}")]
pub struct GatewayError {
    service_error: ServiceError,
}

impl GatewayError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ServiceError::InvalidInput(msg.into()).into()
    }

    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        ServiceError::Unauthenticated(msg.into()).into()
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ServiceError::NotFound(msg.into()).into()
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        ServiceError::PermissionDenied(msg.into()).into()
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ServiceError::Internal(msg.into()).into()
    }

    /// A downstream call that outlived its deadline.
    pub fn deadline(service: &str) -> Self {
        ServiceError::UpstreamTimeout(format!("{service} call timed out")).into()
    }
}

impl From<ServiceError> for GatewayError {
    fn from(service_error: ServiceError) -> Self {
        Self { service_error }
    }
}

impl From<tonic::Status> for GatewayError {
    fn from(status: tonic::Status) -> Self {
        Self {
            service_error: status.into(),
        }
    }
}

impl ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.service_error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "code": self.service_error.status_code(),
            "message": self.service_error.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_exhausted_maps_to_403_with_quota_message() {
        let err: GatewayError = ServiceError::QuotaExhausted("daily quota exceeded".into()).into();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert!(err.to_string().contains("quota"));
    }

    #[test]
    fn tonic_codes_map_through_taxonomy() {
        let err: GatewayError = tonic::Status::resource_exhausted("daily quota exceeded").into();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

        let err: GatewayError = tonic::Status::not_found("nope").into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err: GatewayError = tonic::Status::unknown("mystery").into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
