//! Parse orchestration: cache, platform detection, bounded extraction,
//! resource checkout and usage reporting.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::asset_client::AssetClient;
use crate::cache::{CacheService, ParseResult};
use crate::config::Config;
use crate::detector;
use crate::error::{ParserError, Result};
use crate::normalizer;
use crate::ytdlp::Wrapper;

/// Independent deadline for the cache write, so an extraction that burned
/// the caller's deadline cannot also poison the cache path.
const CACHE_WRITE_DEADLINE: Duration = Duration::from_secs(5);

pub struct ParserService {
    cache: CacheService,
    wrapper: Wrapper,
    limiter: Arc<Semaphore>,
    asset_client: Option<AssetClient>,
    enable_cookies: bool,
}

impl ParserService {
    pub fn new(cfg: &Config, cache: CacheService, asset_client: Option<AssetClient>) -> Self {
        Self {
            cache,
            wrapper: Wrapper::new(&cfg.ytdlp),
            limiter: Arc::new(Semaphore::new(cfg.ytdlp.max_concurrent)),
            enable_cookies: cfg.asset_service.enable_cookies && asset_client.is_some(),
            asset_client,
        }
    }

    /// Validate a URL without touching the extractor.
    pub fn validate_url(&self, url: &str) -> (bool, String, String) {
        let url = detector::normalize_url(url);
        if !detector::is_valid_url(&url) {
            return (false, String::new(), "invalid URL format".to_string());
        }
        match detector::detect_platform(&url) {
            Ok(platform) => (true, platform.to_string(), String::new()),
            Err(e) => (false, String::new(), e.to_string()),
        }
    }

    /// Full parse protocol.
    pub async fn parse_url(&self, url: &str, skip_cache: bool) -> Result<ParseResult> {
        let url = detector::normalize_url(url);
        if !detector::is_valid_url(&url) {
            return Err(ParserError::InvalidUrl);
        }

        if !skip_cache {
            if let Some(cached) = self.cache.get(&url).await {
                info!(url = %url, "cache hit");
                return Ok(cached);
            }
        }

        let platform = detector::detect_platform(&url)?;

        // Cap concurrent extractor subprocesses. The permit is released on
        // every exit path when it drops.
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| ParserError::Internal("limiter closed".into()))?;
        info!(url = %url, platform = %platform, "acquired concurrency slot");

        let mut cookie_file = String::new();
        let mut cookie_id: i64 = 0;
        if self.enable_cookies {
            if let Some(client) = &self.asset_client {
                match client.checkout_cookie(platform).await {
                    Ok(Some((path, id))) => {
                        cookie_file = path.to_string_lossy().into_owned();
                        cookie_id = id;
                    }
                    Ok(None) => info!(platform = %platform, "no cookie available"),
                    Err(e) => warn!(error = %e, "cookie checkout failed, continuing without"),
                }
            }
        }

        let mut proxy_url = String::new();
        let mut proxy_id: i64 = 0;
        if let Some(client) = &self.asset_client {
            match client.checkout_proxy().await {
                Ok(Some((url, id))) => {
                    proxy_url = url;
                    proxy_id = id;
                }
                Ok(None) => info!("no proxy available, using direct connection"),
                Err(e) => warn!(error = %e, "proxy checkout failed, using direct connection"),
            }
        }

        let extraction = self
            .wrapper
            .extract_info(&url, &proxy_url, &cookie_file)
            .await;

        // The extractor is the authority on whether the resources worked.
        if let Some(client) = &self.asset_client {
            if proxy_id != 0 {
                client.report_proxy_usage(proxy_id, extraction.is_ok()).await;
            }
            if cookie_id != 0 {
                client.report_cookie_usage(cookie_id, extraction.is_ok()).await;
            }
            if !cookie_file.is_empty() {
                client
                    .cleanup_cookie_file(std::path::Path::new(&cookie_file))
                    .await;
            }
        }

        let info = extraction?;
        let formats = normalizer::normalize_formats(&info.formats);

        let result = ParseResult {
            video_id: info.id,
            platform: platform.to_string(),
            title: detector::sanitize_text(&info.title),
            description: detector::sanitize_text(&info.description),
            duration: info.duration.unwrap_or(0.0).round() as i64,
            thumbnail: info.thumbnail.unwrap_or_default(),
            author: detector::sanitize_text(&info.uploader.unwrap_or_default()),
            upload_date: info.upload_date.unwrap_or_default(),
            view_count: info.view_count.unwrap_or(0),
            formats,
            cookie_id,
            proxy_url,
        };

        match tokio::time::timeout(CACHE_WRITE_DEADLINE, self.cache.set(&url, &result)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "cache set failed"),
            Err(_) => warn!("cache set timed out"),
        }

        info!(
            url = %url,
            video_id = %result.video_id,
            format_count = result.formats.len(),
            "parse completed"
        );
        Ok(result)
    }
}
