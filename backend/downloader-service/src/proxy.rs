//! Proxy acquisition with retry for the worker.
//!
//! The worker prefers the proxy captured in the task message; this
//! provider is the fallback when the parser ran without one. Two
//! sources: an external vendor API (when configured) or the asset
//! service pool. An empty URL means direct connection.

use serde::Deserialize;
use std::time::Duration;
use tonic::transport::Channel;
use tracing::{info, warn};

use grpc_clients::vget::asset::v1::GetAvailableProxyRequest;
use grpc_clients::AssetServiceClient;

use crate::config::{ProxyApiConfig, RetryConfig};
use crate::error::{Result, WorkerError};

/// Vendor API response shape.
#[derive(Debug, Deserialize)]
struct VendorProxy {
    ip: String,
    port: u16,
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Clone)]
pub struct ProxyProvider {
    client: Option<AssetServiceClient<Channel>>,
    api: Option<ProxyApiConfig>,
    http: reqwest::Client,
    retry: RetryConfig,
}

impl ProxyProvider {
    pub fn new(
        client: Option<AssetServiceClient<Channel>>,
        api: Option<ProxyApiConfig>,
        retry: RetryConfig,
    ) -> Self {
        let timeout = api
            .as_ref()
            .map(|a| a.timeout_secs)
            .unwrap_or(10);
        Self {
            client,
            api,
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout))
                .build()
                .unwrap_or_default(),
            retry,
        }
    }

    async fn from_vendor_api(&self, api: &ProxyApiConfig) -> Result<String> {
        let resp = self
            .http
            .get(&api.endpoint)
            .bearer_auth(&api.api_key)
            .send()
            .await
            .map_err(|e| WorkerError::ProxyUnavailable(format!("proxy API request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(WorkerError::ProxyUnavailable(format!(
                "proxy API returned {}",
                resp.status()
            )));
        }

        let vendor: VendorProxy = resp
            .json()
            .await
            .map_err(|e| WorkerError::ProxyUnavailable(format!("bad proxy API response: {e}")))?;

        let url = if !vendor.username.is_empty() && !vendor.password.is_empty() {
            format!(
                "http://{}:{}@{}:{}",
                vendor.username, vendor.password, vendor.ip, vendor.port
            )
        } else {
            format!("http://{}:{}", vendor.ip, vendor.port)
        };
        Ok(url)
    }

    async fn from_asset_pool(&self) -> Result<String> {
        let Some(client) = &self.client else {
            // Nothing configured: direct connection.
            return Ok(String::new());
        };

        let mut client = client.clone();
        let resp = client
            .get_available_proxy(GetAvailableProxyRequest {
                protocol: String::new(),
                region: String::new(),
            })
            .await
            .map_err(|e| WorkerError::ProxyUnavailable(e.message().to_string()))?
            .into_inner();

        Ok(resp.proxy_url)
    }

    async fn get_proxy(&self) -> Result<String> {
        match &self.api {
            Some(api) if api.enabled => self.from_vendor_api(api).await,
            _ => self.from_asset_pool().await,
        }
    }

    /// Acquire a proxy with exponential backoff. An empty URL is a valid
    /// outcome (direct connection).
    pub async fn get_proxy_with_retry(&self) -> Result<String> {
        let mut last_err: Option<WorkerError> = None;

        for attempt in 0..self.retry.max_attempts {
            match self.get_proxy().await {
                Ok(url) => {
                    if !url.is_empty() {
                        info!(attempt = attempt + 1, "proxy acquired");
                    }
                    return Ok(url);
                }
                Err(e) => {
                    warn!(attempt = attempt + 1, error = %e, "proxy acquisition failed");
                    last_err = Some(e);
                    if attempt + 1 < self.retry.max_attempts {
                        tokio::time::sleep(self.retry.delay(attempt)).await;
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| WorkerError::ProxyUnavailable("no attempts made".into())))
    }
}
