//! Progress line parsing and publication.
//!
//! The extractor writes one progress line per update when forced into
//! newline mode:
//!
//! ```text
//! [download]  45.2% of 100.00MiB at 2.50MiB/s ETA 00:22
//! ```
//!
//! Interspersed non-progress lines and truncated lines are tolerated;
//! only lines matching the percent pattern are samples.

use once_cell::sync::Lazy;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use regex::Regex;
use tracing::{debug, warn};

use vget_common::ProgressEvent;

static PERCENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+\.?\d*)%").expect("percent pattern"));
static SPEED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"at\s+(\d+\.?\d*\w+/s)").expect("speed pattern"));
static ETA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"ETA\s+(\d+:\d+)").expect("eta pattern"));

/// A parsed progress sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSample {
    pub percent: f64,
    pub speed: Option<String>,
    pub eta: Option<String>,
}

/// Parse one stdout line; `None` when the line is not a progress sample.
pub fn parse_progress_line(line: &str) -> Option<ProgressSample> {
    if !line.contains("[download]") {
        return None;
    }

    let percent: f64 = PERCENT_RE
        .captures(line)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())?;

    let speed = SPEED_RE
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    let eta = ETA_RE
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    Some(ProgressSample {
        percent,
        speed,
        eta,
    })
}

/// Publishes progress events on `progress:{task_id}`. Failures are
/// logged, never fatal; subscribers that are late simply miss samples.
#[derive(Clone)]
pub struct ProgressPublisher {
    redis: ConnectionManager,
}

impl ProgressPublisher {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    pub async fn publish(&self, event: &ProgressEvent) {
        let channel = ProgressEvent::channel(&event.task_id);
        let payload = match serde_json::to_string(event) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "failed to serialize progress event");
                return;
            }
        };

        let mut conn = self.redis.clone();
        match conn.publish::<_, _, ()>(&channel, payload).await {
            Ok(()) => debug!(channel = %channel, percent = event.percent, "published progress"),
            Err(e) => warn!(channel = %channel, error = %e, "failed to publish progress"),
        }
    }

    pub async fn publish_downloading(&self, task_id: &str, sample: &ProgressSample) {
        let event = ProgressEvent::downloading(
            task_id,
            sample.percent,
            sample.speed.clone(),
            sample.eta.clone(),
        );
        self.publish(&event).await;
    }

    pub async fn publish_completed(&self, task_id: &str, message: &str, file_size: Option<i64>) {
        self.publish(&ProgressEvent::completed(task_id, message, file_size))
            .await;
    }

    pub async fn publish_failed(&self, task_id: &str, message: &str) {
        self.publish(&ProgressEvent::failed(task_id, message)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_progress_line() {
        let sample =
            parse_progress_line("[download]  45.2% of 100.00MiB at 2.50MiB/s ETA 00:22").unwrap();
        assert_eq!(sample.percent, 45.2);
        assert_eq!(sample.speed.as_deref(), Some("2.50MiB/s"));
        assert_eq!(sample.eta.as_deref(), Some("00:22"));
    }

    #[test]
    fn tolerates_truncated_lines() {
        // Pipe flushing can cut a line short; percent alone still counts.
        let sample = parse_progress_line("[download]  87.0% of 10.00M").unwrap();
        assert_eq!(sample.percent, 87.0);
        assert!(sample.speed.is_none());
        assert!(sample.eta.is_none());
    }

    #[test]
    fn ignores_non_progress_lines() {
        assert!(parse_progress_line("[youtube] abc: Downloading webpage").is_none());
        assert!(parse_progress_line("[download] Destination: /tmp/v.mp4").is_none());
        assert!(parse_progress_line("[Merger] Merging formats").is_none());
        assert!(parse_progress_line("").is_none());
    }

    #[test]
    fn hundred_percent_parses() {
        let sample = parse_progress_line("[download] 100% of 100.00MiB in 00:41").unwrap();
        assert_eq!(sample.percent, 100.0);
    }
}
