//! Cookie materialization and usage reporting for the worker.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tonic::transport::Channel;
use tracing::{info, warn};

use grpc_clients::vget::asset::v1::{GetCookieContentRequest, ReportCookieUsageRequest};
use grpc_clients::AssetServiceClient;

use crate::error::{Result, WorkerError};

#[derive(Clone)]
pub struct AssetClient {
    client: AssetServiceClient<Channel>,
    cookie_temp_dir: PathBuf,
}

impl AssetClient {
    pub async fn connect(addr: &str, cookie_temp_dir: &str) -> Result<Self> {
        let client = AssetServiceClient::connect(addr.to_string())
            .await
            .map_err(|e| WorkerError::Internal(format!("failed to connect asset service: {e}")))?;
        tokio::fs::create_dir_all(cookie_temp_dir).await?;
        Ok(Self {
            client,
            cookie_temp_dir: PathBuf::from(cookie_temp_dir),
        })
    }

    /// Fetch the payload of the cookie captured at parse time and write
    /// it to a per-task temp file with owner-only permissions.
    pub async fn materialize_cookie(&self, cookie_id: i64, task_id: &str) -> Result<PathBuf> {
        let mut client = self.client.clone();
        let resp = client
            .get_cookie_content(GetCookieContentRequest { cookie_id })
            .await
            .map_err(|e| WorkerError::Internal(format!("cookie fetch failed: {e}")))?
            .into_inner();

        let path = self.cookie_temp_dir.join(format!("task_{task_id}.txt"));
        tokio::fs::write(&path, resp.content.as_bytes()).await?;
        tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).await?;

        info!(cookie_id, task_id = %task_id, "cookie materialized");
        Ok(path)
    }

    pub async fn cleanup_cookie_file(&self, path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "failed to remove cookie file"),
        }
    }

    pub async fn report_cookie_usage(&self, cookie_id: i64, success: bool) {
        let mut client = self.client.clone();
        if let Err(e) = client
            .report_cookie_usage(ReportCookieUsageRequest { cookie_id, success })
            .await
        {
            warn!(cookie_id, error = %e, "failed to report cookie usage");
        }
    }

    pub fn grpc(&self) -> AssetServiceClient<Channel> {
        self.client.clone()
    }
}
