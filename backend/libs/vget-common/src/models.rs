//! Wire models shared across services.
//!
//! `TaskMessage` is the broker payload published by the gateway and
//! consumed by the downloader. `ProgressEvent` is the JSON record broadcast
//! on the `progress:{task_id}` pub/sub channels.

use serde::{Deserialize, Serialize};

/// Download mode selected at submission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskMode {
    QuickDownload,
    Archive,
}

impl TaskMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskMode::QuickDownload => "quick_download",
            TaskMode::Archive => "archive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "quick_download" => Some(TaskMode::QuickDownload),
            "archive" => Some(TaskMode::Archive),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle states of a history row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    PendingCleanup,
    Expired,
}

impl HistoryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryStatus::Pending => "pending",
            HistoryStatus::Processing => "processing",
            HistoryStatus::Completed => "completed",
            HistoryStatus::Failed => "failed",
            HistoryStatus::PendingCleanup => "pending_cleanup",
            HistoryStatus::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(HistoryStatus::Pending),
            "processing" => Some(HistoryStatus::Processing),
            "completed" => Some(HistoryStatus::Completed),
            "failed" => Some(HistoryStatus::Failed),
            "pending_cleanup" => Some(HistoryStatus::PendingCleanup),
            "expired" => Some(HistoryStatus::Expired),
            _ => None,
        }
    }

    /// A file path may only be present in these states.
    pub fn may_carry_file(&self) -> bool {
        matches!(self, HistoryStatus::Completed | HistoryStatus::PendingCleanup)
    }
}

impl std::fmt::Display for HistoryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task message published to the broker.
///
/// `cookie_id` and `proxy_url` are the selections captured during the
/// metadata parse; the downloader reuses them so that site tokens stay
/// valid and region-locked content stays reachable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskMessage {
    pub task_id: String,
    pub user_id: String,
    pub history_id: i64,
    pub url: String,
    pub mode: TaskMode,
    pub quality: String,
    pub format: String,
    pub platform: String,
    pub title: String,
    #[serde(default)]
    pub cookie_id: i64,
    #[serde(default)]
    pub proxy_url: String,
}

/// In-flight states reported on the progress fabric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Pending,
    Downloading,
    Merging,
    Completed,
    Failed,
}

impl ProgressStatus {
    /// Terminal states end a single-task subscription.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressStatus::Completed | ProgressStatus::Failed)
    }
}

/// Progress event broadcast on `progress:{task_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub task_id: String,
    pub status: ProgressStatus,
    pub percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloaded_bytes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_bytes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i32>,
}

impl ProgressEvent {
    pub fn channel(task_id: &str) -> String {
        format!("progress:{task_id}")
    }

    pub fn downloading(task_id: &str, percent: f64, speed: Option<String>, eta: Option<String>) -> Self {
        Self {
            task_id: task_id.to_string(),
            status: ProgressStatus::Downloading,
            percent,
            downloaded_bytes: None,
            total_bytes: None,
            speed,
            eta,
            message: None,
            history_id: None,
            file_size: None,
            error_code: None,
        }
    }

    pub fn completed(task_id: &str, message: &str, file_size: Option<i64>) -> Self {
        Self {
            task_id: task_id.to_string(),
            status: ProgressStatus::Completed,
            percent: 100.0,
            downloaded_bytes: None,
            total_bytes: None,
            speed: None,
            eta: None,
            message: Some(message.to_string()),
            history_id: None,
            file_size,
            error_code: None,
        }
    }

    pub fn failed(task_id: &str, message: &str) -> Self {
        Self {
            task_id: task_id.to_string(),
            status: ProgressStatus::Failed,
            percent: 0.0,
            downloaded_bytes: None,
            total_bytes: None,
            speed: None,
            eta: None,
            message: Some(message.to_string()),
            history_id: None,
            file_size: None,
            error_code: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_mode_round_trips_snake_case() {
        let json = serde_json::to_string(&TaskMode::QuickDownload).unwrap();
        assert_eq!(json, "\"quick_download\"");
        let back: TaskMode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TaskMode::QuickDownload);
    }

    #[test]
    fn progress_event_omits_absent_fields() {
        let evt = ProgressEvent::downloading("t1", 42.5, Some("2.50MiB/s".into()), None);
        let json = serde_json::to_string(&evt).unwrap();
        assert!(json.contains("\"percent\":42.5"));
        assert!(json.contains("downloading"));
        assert!(!json.contains("eta"));
        assert!(!json.contains("error_code"));
    }

    #[test]
    fn channel_name_is_task_scoped() {
        assert_eq!(ProgressEvent::channel("abc-123"), "progress:abc-123");
    }

    #[test]
    fn terminal_states() {
        assert!(ProgressStatus::Completed.is_terminal());
        assert!(ProgressStatus::Failed.is_terminal());
        assert!(!ProgressStatus::Downloading.is_terminal());
        // 100% alone is not terminal; only the status decides.
        assert!(!ProgressStatus::Merging.is_terminal());
    }

    #[test]
    fn file_path_states() {
        assert!(HistoryStatus::Completed.may_carry_file());
        assert!(HistoryStatus::PendingCleanup.may_carry_file());
        assert!(!HistoryStatus::Expired.may_carry_file());
        assert!(!HistoryStatus::Pending.may_carry_file());
    }

    #[test]
    fn task_message_json_matches_broker_contract() {
        let msg = TaskMessage {
            task_id: "abc".into(),
            user_id: "u1".into(),
            history_id: 7,
            url: "https://example.com/v/1".into(),
            mode: TaskMode::Archive,
            quality: "1080p".into(),
            format: "mp4".into(),
            platform: "youtube".into(),
            title: "t".into(),
            cookie_id: 0,
            proxy_url: String::new(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"mode\":\"archive\""));
        let back: TaskMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.history_id, 7);
    }
}
