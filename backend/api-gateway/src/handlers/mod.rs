pub mod auth;
pub mod cookie;
pub mod download;
pub mod file;
pub mod health;
pub mod history;
pub mod parse;
pub mod proxy;

use std::future::Future;
use std::time::Duration;

use crate::error::GatewayError;

/// Every downstream call is deadline-bounded; a timeout surfaces as
/// `upstream_timeout` without waiting on the transport.
pub(crate) async fn with_deadline<T, F>(
    timeout_secs: u64,
    service: &str,
    fut: F,
) -> Result<T, GatewayError>
where
    F: Future<Output = Result<tonic::Response<T>, tonic::Status>>,
{
    match tokio::time::timeout(Duration::from_secs(timeout_secs), fut).await {
        Ok(Ok(resp)) => Ok(resp.into_inner()),
        Ok(Err(status)) => Err(status.into()),
        Err(_) => Err(GatewayError::deadline(service)),
    }
}
