//! Client for the asset service: cookie and proxy checkout plus usage
//! reporting. Cookie payloads are materialized into request-scoped temp
//! files with 0600 permissions.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tonic::transport::Channel;
use tracing::{info, warn};
use uuid::Uuid;

use grpc_clients::vget::asset::v1::{
    GetAvailableCookieRequest, GetAvailableProxyRequest, ReportCookieUsageRequest,
    ReportProxyUsageRequest,
};
use grpc_clients::AssetServiceClient;

use crate::error::{ParserError, Result};

#[derive(Clone)]
pub struct AssetClient {
    client: AssetServiceClient<Channel>,
    cookie_temp_dir: PathBuf,
}

impl AssetClient {
    pub async fn connect(addr: &str, cookie_temp_dir: &str) -> Result<Self> {
        let client = AssetServiceClient::connect(addr.to_string())
            .await
            .map_err(|e| ParserError::Internal(format!("failed to connect asset service: {e}")))?;
        tokio::fs::create_dir_all(cookie_temp_dir)
            .await
            .map_err(|e| ParserError::Internal(format!("failed to create cookie temp dir: {e}")))?;
        Ok(Self {
            client,
            cookie_temp_dir: PathBuf::from(cookie_temp_dir),
        })
    }

    /// Check out a cookie for a platform and write its payload to a temp
    /// file. Returns `None` when the pool is empty.
    pub async fn checkout_cookie(&self, platform: &str) -> Result<Option<(PathBuf, i64)>> {
        let mut client = self.client.clone();
        let resp = client
            .get_available_cookie(GetAvailableCookieRequest {
                platform: platform.to_string(),
            })
            .await
            .map_err(|e| ParserError::Internal(format!("cookie checkout failed: {e}")))?
            .into_inner();

        if resp.cookie_id == 0 || resp.content.is_empty() {
            return Ok(None);
        }

        let file = self
            .cookie_temp_dir
            .join(format!("{}_{}.txt", platform, Uuid::new_v4()));
        tokio::fs::write(&file, resp.content.as_bytes())
            .await
            .map_err(|e| ParserError::Internal(format!("failed to write cookie file: {e}")))?;
        // Cookie payloads are credentials; owner-only access.
        tokio::fs::set_permissions(&file, std::fs::Permissions::from_mode(0o600))
            .await
            .map_err(|e| ParserError::Internal(format!("failed to chmod cookie file: {e}")))?;

        info!(cookie_id = resp.cookie_id, platform = %platform, "cookie materialized");
        Ok(Some((file, resp.cookie_id)))
    }

    pub async fn cleanup_cookie_file(&self, path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "failed to remove cookie file"),
        }
    }

    /// Check out an egress proxy. Empty response means direct connection.
    pub async fn checkout_proxy(&self) -> Result<Option<(String, i64)>> {
        let mut client = self.client.clone();
        let resp = client
            .get_available_proxy(GetAvailableProxyRequest {
                protocol: String::new(),
                region: String::new(),
            })
            .await
            .map_err(|e| ParserError::Internal(format!("proxy checkout failed: {e}")))?
            .into_inner();

        if resp.proxy_id == 0 || resp.proxy_url.is_empty() {
            return Ok(None);
        }
        Ok(Some((resp.proxy_url, resp.proxy_id)))
    }

    pub async fn report_cookie_usage(&self, cookie_id: i64, success: bool) {
        let mut client = self.client.clone();
        let result = client
            .report_cookie_usage(ReportCookieUsageRequest { cookie_id, success })
            .await;
        if let Err(e) = result {
            warn!(cookie_id, error = %e, "failed to report cookie usage");
        }
    }

    pub async fn report_proxy_usage(&self, proxy_id: i64, success: bool) {
        let mut client = self.client.clone();
        let result = client
            .report_proxy_usage(ReportProxyUsageRequest { proxy_id, success })
            .await;
        if let Err(e) = result {
            warn!(proxy_id, error = %e, "failed to report proxy usage");
        }
    }
}
