//! Metadata-only yt-dlp wrapper.

use serde::Deserialize;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::YtdlpConfig;
use crate::error::{classify_stderr, ParserError, Result};

/// Raw format entry as emitted by `--dump-json`. Fields are optional
/// because the extractor emits nulls freely.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFormat {
    pub format_id: Option<String>,
    pub ext: Option<String>,
    pub resolution: Option<String>,
    pub filesize: Option<i64>,
    pub filesize_approx: Option<i64>,
    pub fps: Option<f64>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub height: Option<i32>,
    pub width: Option<i32>,
    pub vbr: Option<f64>,
    pub abr: Option<f64>,
    pub asr: Option<i64>,
}

/// Metadata record parsed from the extractor's JSON output.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub upload_date: Option<String>,
    #[serde(default)]
    pub view_count: Option<i64>,
    #[serde(default)]
    pub formats: Vec<RawFormat>,
}

/// Executes yt-dlp in metadata-only mode.
pub struct Wrapper {
    binary_path: String,
    timeout: Duration,
    default_args: Vec<String>,
}

impl Wrapper {
    pub fn new(cfg: &YtdlpConfig) -> Self {
        Self {
            binary_path: cfg.binary_path.clone(),
            timeout: Duration::from_secs(cfg.timeout_secs),
            default_args: cfg.default_args.clone(),
        }
    }

    fn build_args(&self, url: &str, proxy_url: &str, cookie_file: &str) -> Vec<String> {
        let mut args = vec![
            "--dump-json".to_string(),
            "--no-download".to_string(),
            "--no-playlist".to_string(),
        ];
        args.extend(self.default_args.iter().cloned());
        if !proxy_url.is_empty() {
            args.push("--proxy".to_string());
            args.push(proxy_url.to_string());
        }
        if !cookie_file.is_empty() {
            args.push("--cookies".to_string());
            args.push(cookie_file.to_string());
        }
        args.push(url.to_string());
        args
    }

    /// Run the extractor and parse its JSON output. Timeouts are the only
    /// transient failure; other stderr output is classified terminally.
    pub async fn extract_info(
        &self,
        url: &str,
        proxy_url: &str,
        cookie_file: &str,
    ) -> Result<VideoInfo> {
        let args = self.build_args(url, proxy_url, cookie_file);
        debug!(binary = %self.binary_path, ?args, "running extractor");

        let child = Command::new(&self.binary_path)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ParserError::ExtractorNotFound)
            }
            Ok(Err(e)) => return Err(ParserError::Internal(format!("failed to spawn extractor: {e}"))),
            Err(_) => return Err(ParserError::Timeout),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_stderr(&stderr));
        }

        let info: VideoInfo = serde_json::from_slice(&output.stdout)
            .map_err(|e| ParserError::Internal(format!("failed to parse extractor output: {e}")))?;

        info!(video_id = %info.id, formats = info.formats.len(), "extractor returned metadata");
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrapper() -> Wrapper {
        Wrapper {
            binary_path: "yt-dlp".into(),
            timeout: Duration::from_secs(30),
            default_args: vec!["--no-warnings".into()],
        }
    }

    #[test]
    fn args_include_proxy_and_cookies_when_present() {
        let w = wrapper();
        let args = w.build_args("https://example.com/v/1", "http://10.0.0.2:8080", "/tmp/c.txt");
        assert_eq!(args[0], "--dump-json");
        assert!(args.contains(&"--no-playlist".to_string()));
        assert!(args.contains(&"--no-warnings".to_string()));
        let proxy_idx = args.iter().position(|a| a == "--proxy").unwrap();
        assert_eq!(args[proxy_idx + 1], "http://10.0.0.2:8080");
        let cookie_idx = args.iter().position(|a| a == "--cookies").unwrap();
        assert_eq!(args[cookie_idx + 1], "/tmp/c.txt");
        assert_eq!(args.last().unwrap(), "https://example.com/v/1");
    }

    #[test]
    fn args_omit_absent_resources() {
        let w = wrapper();
        let args = w.build_args("https://example.com/v/1", "", "");
        assert!(!args.contains(&"--proxy".to_string()));
        assert!(!args.contains(&"--cookies".to_string()));
    }

    #[test]
    fn video_info_tolerates_nulls() {
        let json = r#"{
            "id": "abc", "title": "T", "duration": 63.4,
            "formats": [{"format_id": "22", "vcodec": null, "acodec": "mp4a", "height": null}]
        }"#;
        let info: VideoInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.id, "abc");
        assert_eq!(info.formats.len(), 1);
        assert!(info.formats[0].vcodec.is_none());
    }
}
