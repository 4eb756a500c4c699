//! Redis-backed parse-result cache keyed by a digest of the normalized
//! URL.

use md5::{Digest, Md5};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use crate::normalizer::NormalizedFormat;

/// Cached parse result. `cookie_id` and `proxy_url` record which
/// resources produced this record so resubmissions reuse them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseResult {
    pub video_id: String,
    pub platform: String,
    pub title: String,
    pub description: String,
    pub duration: i64,
    pub thumbnail: String,
    pub author: String,
    pub upload_date: String,
    pub view_count: i64,
    pub formats: Vec<NormalizedFormat>,
    #[serde(default)]
    pub cookie_id: i64,
    #[serde(default)]
    pub proxy_url: String,
}

pub fn cache_key(url: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(url.as_bytes());
    format!("parser:url:{}", hex::encode(hasher.finalize()))
}

#[derive(Clone)]
pub struct CacheService {
    redis: ConnectionManager,
    ttl: Duration,
}

impl CacheService {
    pub fn new(redis: ConnectionManager, ttl: Duration) -> Self {
        Self { redis, ttl }
    }

    pub async fn get(&self, url: &str) -> Option<ParseResult> {
        let key = cache_key(url);
        let mut conn = self.redis.clone();
        let raw: Option<Vec<u8>> = match conn.get(&key).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "cache read failed");
                return None;
            }
        };
        raw.and_then(|bytes| serde_json::from_slice(&bytes).ok())
    }

    /// Store a result. Callers give this its own short deadline so a
    /// slow cache cannot poison the parse path.
    pub async fn set(&self, url: &str, result: &ParseResult) -> anyhow::Result<()> {
        let key = cache_key(url);
        let payload = serde_json::to_vec(result)?;
        let mut conn = self.redis.clone();
        conn.set_ex::<_, _, ()>(&key, payload, self.ttl.as_secs())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_stable_digest() {
        let a = cache_key("https://example.com/v/1");
        let b = cache_key("https://example.com/v/1");
        let c = cache_key("https://example.com/v/2");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("parser:url:"));
        // md5 hex digest is 32 chars
        assert_eq!(a.len(), "parser:url:".len() + 32);
    }
}
